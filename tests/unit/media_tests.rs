/*!
 * Tests for stream probing, stream selection and the extraction command
 */

use std::ffi::OsString;
use std::path::Path;

use subconvert::app_config::ExtractionConfig;
use subconvert::errors::ConfigError;
use subconvert::media::probe::parse_probe_output;
use subconvert::media::{FALLBACK_GEOMETRY, FrameExtractor, filter_ffmpeg_stderr, is_subpicture_codec};
use subconvert::text_line::FrameGeometry;

const MOVIE: &str = r#"{
    "streams": [
        { "index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840, "height": 1600 },
        { "index": 1, "codec_type": "audio", "codec_name": "eac3" },
        { "index": 2, "codec_type": "subtitle", "codec_name": "subrip", "tags": { "language": "eng" } },
        { "index": 3, "codec_type": "subtitle", "codec_name": "hdmv_pgs_subtitle",
          "width": 1920, "height": 1080, "tags": { "language": "fre" } },
        { "index": 4, "codec_type": "subtitle", "codec_name": "dvd_subtitle", "tags": { "language": "ger", "title": "Forced" } }
    ],
    "format": { "duration": "5423.104000" }
}"#;

#[test]
fn test_parseProbeOutput_withMovie_shouldListSubtitleStreamsInOrder() {
    let info = parse_probe_output(MOVIE).unwrap();

    let indices: Vec<usize> = info.subtitle_streams.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![2, 3, 4]);
    assert_eq!(info.video_size, Some((3840, 1600)));
    assert_eq!(info.duration, Some(5423.104));
    assert_eq!(info.subtitle_streams[2].title.as_deref(), Some("Forced"));
}

#[test]
fn test_selectStream_byOrdinal_shouldCheckCodecAndRange() {
    let info = parse_probe_output(MOVIE).unwrap();

    assert!(matches!(info.select_stream(0), Err(ConfigError::UnsupportedCodec(codec)) if codec == "subrip"));
    assert_eq!(info.select_stream(1).unwrap().index, 3);
    assert!(matches!(
        info.select_stream(3),
        Err(ConfigError::StreamIndexOutOfRange { requested: 3, available: 3 })
    ));
}

#[test]
fn test_selectStream_withoutSubtitles_shouldFail() {
    let info = parse_probe_output(r#"{ "streams": [ { "index": 0, "codec_type": "video", "width": 640, "height": 360 } ] }"#)
        .unwrap();
    assert!(matches!(info.select_stream(0), Err(ConfigError::NoSubtitleStreams)));
}

#[test]
fn test_geometryFor_shouldPreferStreamThenVideoThenFallback() {
    let info = parse_probe_output(MOVIE).unwrap();

    let pgs = info.select_stream(1).unwrap();
    assert_eq!(info.geometry_for(pgs), FrameGeometry { width: 1920, height: 1080 });
    let vobsub = info.select_stream(2).unwrap();
    assert_eq!(info.geometry_for(vobsub), FrameGeometry { width: 3840, height: 1600 });

    let bare = parse_probe_output(r#"{ "streams": [ { "index": 0, "codec_type": "subtitle", "codec_name": "dvd_subtitle" } ] }"#)
        .unwrap();
    assert_eq!(bare.geometry_for(&bare.subtitle_streams[0]), FALLBACK_GEOMETRY);
}

#[test]
fn test_parseProbeOutput_withGarbage_shouldFail() {
    assert!(parse_probe_output("not json").is_err());
    assert!(parse_probe_output("").unwrap().subtitle_streams.is_empty());
}

#[test]
fn test_isSubpictureCodec_shouldRecognizeBitmapCodecs() {
    assert!(is_subpicture_codec("hdmv_pgs_subtitle"));
    assert!(is_subpicture_codec("dvb_subtitle"));
    assert!(!is_subpicture_codec("ass"));
}

#[test]
fn test_extractorArguments_shouldOverlayStreamOnBlankCanvas() {
    let config = ExtractionConfig {
        frame_rate: 5.0,
        ..Default::default()
    };
    let extractor = FrameExtractor::new(&config);
    let info = parse_probe_output(MOVIE).unwrap();
    let stream = info.select_stream(1).unwrap();

    let args = extractor.arguments(
        Path::new("movie.mkv"),
        stream,
        info.geometry_for(stream),
        Path::new("/tmp/frames"),
    );
    let args: Vec<String> = args.iter().map(|a: &OsString| a.to_string_lossy().into_owned()).collect();

    assert!(args.contains(&"color=size=1920x1080:rate=5:color=black".to_string()));
    assert!(args.contains(&"[1:v][0:3]overlay,mpdecimate[out]".to_string()));
    assert!(!args.contains(&"-ss".to_string()));
    assert!(args.last().unwrap().ends_with("%06d.png"));
}

#[test]
fn test_filterFfmpegStderr_shouldDropBanner() {
    let stderr = "ffmpeg version 6.1\n  built with gcc\n  Stream #0:3: Subtitle: hdmv_pgs_subtitle\n[matroska] Invalid data\n";
    assert_eq!(filter_ffmpeg_stderr(stderr), "[matroska] Invalid data");
}
