use std::env;
use std::path::{Path, PathBuf};

const WATCHED_VARIABLES: [&str; 4] = ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"];
const DEFAULT_TRIPLET: &str = "x64-windows";

fn main() {
    for variable in WATCHED_VARIABLES {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    // ffmpeg-sys-next finds FFmpeg through pkg-config everywhere but Windows.
    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");
    if !windows || env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_install() {
        None => warn("FFMPEG_DIR is unset; point it at an FFmpeg install (for example a vcpkg triplet directory) before building labelframes on Windows."),
        Some(directory) if directory.exists() => {
            warn(&format!(
                "Found FFmpeg under vcpkg at {0}; export FFMPEG_DIR={0} so ffmpeg-sys-next links against it.",
                directory.display()
            ));
            if env::var_os("VCPKGRS_DYNAMIC").is_none() {
                warn("Dynamic vcpkg FFmpeg builds also need VCPKGRS_DYNAMIC=1.");
            }
        }
        Some(directory) => warn(&format!(
            "VCPKG_ROOT is set, but {} holds no FFmpeg install.",
            directory.display()
        )),
    }
}

fn vcpkg_install() -> Option<PathBuf> {
    let root = env::var("VCPKG_ROOT").ok()?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| DEFAULT_TRIPLET.to_string());
    Some(Path::new(&root).join("installed").join(triplet))
}

fn warn(message: &str) {
    println!("cargo:warning={message}");
}
