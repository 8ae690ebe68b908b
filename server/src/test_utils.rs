use std::fs;
use std::io::Cursor;
use std::path::Path;

use lofty::config::WriteOptions;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::tag::{Accessor, Tag, TagExt, TagType};

/// A minimal valid PCM WAV file (mono, 8 kHz, 16-bit, 0.1 s of silence).
pub(crate) fn write_wav(path: &Path) {
    let data_len: u32 = 1600;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&8000u32.to_le_bytes());
    bytes.extend_from_slice(&16000u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    fs::write(path, bytes).unwrap();
}

#[derive(Default)]
pub(crate) struct WavTags<'a> {
    pub album: Option<&'a str>,
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub track_no: Option<u32>,
    pub disc_no: Option<u32>,
    pub cover: Option<Vec<u8>>,
}

/// Writes a WAV file and embeds an ID3v2 tag with the given fields.
pub(crate) fn write_tagged_wav(path: &Path, tags: WavTags<'_>) {
    write_wav(path);

    let mut tag = Tag::new(TagType::Id3v2);
    if let Some(album) = tags.album {
        tag.set_album(album.to_string());
    }
    if let Some(title) = tags.title {
        tag.set_title(title.to_string());
    }
    if let Some(artist) = tags.artist {
        tag.set_artist(artist.to_string());
    }
    if let Some(track_no) = tags.track_no {
        tag.set_track(track_no);
    }
    if let Some(disc_no) = tags.disc_no {
        tag.set_disk(disc_no);
    }
    if let Some(cover) = tags.cover {
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(MimeType::Png),
            None,
            cover,
        ));
    }
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}

/// An 8x8 PNG, for embedded-cover fixtures.
pub(crate) fn png_bytes() -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image::RgbImage::new(8, 8)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}
