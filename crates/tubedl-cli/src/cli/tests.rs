use super::*;
use tubedl_core::resolution::Resolution;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_bare() {
    let cli = parse(&["tubedl"]);
    assert!(cli.reference.is_none());
    assert!(cli.downloads_dir.is_none());
    assert!(!cli.no_mux);
    assert!(cli.resolution.is_none());
}

#[test]
fn cli_parse_reference() {
    let cli = parse(&["tubedl", "https://www.youtube.com/watch?v=L1Buw5XPj_k"]);
    assert_eq!(cli.reference.as_deref(), Some("https://www.youtube.com/watch?v=L1Buw5XPj_k"));
}

#[test]
fn cli_parse_resolution() {
    let cli = parse(&["tubedl", "--resolution", "720p", "x"]);
    assert_eq!(cli.resolution, Some(ResolutionChoice::Explicit(Resolution::new(720))));
    let cli = parse(&["tubedl", "--resolution", "best"]);
    assert_eq!(cli.resolution, Some(ResolutionChoice::Best));
}

#[test]
fn cli_parse_bad_resolution() {
    assert!(Cli::try_parse_from(["tubedl", "--resolution", "huge"]).is_err());
}

#[test]
fn cli_parse_overrides() {
    let cli = parse(&["tubedl", "--downloads-dir", "/tmp/out", "--muxer", "/usr/bin/ffmpeg"]);
    assert_eq!(cli.downloads_dir, Some(PathBuf::from("/tmp/out")));
    assert_eq!(cli.muxer.as_deref(), Some("/usr/bin/ffmpeg"));
}

#[test]
fn cli_parse_no_mux_conflicts_with_muxer() {
    assert!(parse(&["tubedl", "--no-mux"]).no_mux);
    assert!(Cli::try_parse_from(["tubedl", "--no-mux", "--muxer", "ffmpeg"]).is_err());
}
