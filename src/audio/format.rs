// Format dispatch by file extension

use std::fmt;
use std::path::Path;

/// Codecs the engine can stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Lossless-frame decoding
    Flac,
    /// Bitstream decoding (Ogg Vorbis)
    Vorbis,
}

impl AudioFormat {
    /// Map a path to a codec by the text after the last `.` of its file
    /// name, compared case-insensitively. A bare `.ogg` counts as Vorbis.
    /// Unknown or missing extensions give `None`.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.eq_ignore_ascii_case("flac") {
            Some(Self::Flac)
        } else if ext.eq_ignore_ascii_case("ogg") {
            Some(Self::Vorbis)
        } else {
            None
        }
    }

}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flac => write!(f, "FLAC"),
            Self::Vorbis => write!(f, "Ogg Vorbis"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_known_extensions() {
        assert_eq!(AudioFormat::from_path(Path::new("/music/a.flac")), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::from_path(Path::new("b.ogg")), Some(AudioFormat::Vorbis));
    }

    #[test]
    fn extension_match_ignores_case() {
        assert_eq!(AudioFormat::from_path(Path::new("SONG.FLAC")), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::from_path(Path::new("song.OgG")), Some(AudioFormat::Vorbis));
    }

    #[test]
    fn rejects_everything_else() {
        assert_eq!(AudioFormat::from_path(Path::new("song.mp3")), None);
        assert_eq!(AudioFormat::from_path(Path::new("song")), None);
        assert_eq!(AudioFormat::from_path(Path::new("flac")), None);
        assert_eq!(AudioFormat::from_path(Path::new("song.flac.bak")), None);
        assert_eq!(AudioFormat::from_path(Path::new("song.")), None);
        assert_eq!(AudioFormat::from_path(Path::new("/music/flac.d/song")), None);
    }

    #[test]
    fn dot_names_use_the_last_suffix() {
        assert_eq!(AudioFormat::from_path(Path::new(".ogg")), Some(AudioFormat::Vorbis));
        assert_eq!(AudioFormat::from_path(Path::new("/music/.FLAC")), Some(AudioFormat::Flac));
        assert_eq!(AudioFormat::from_path(Path::new("song.bak.ogg")), Some(AudioFormat::Vorbis));
    }
}
