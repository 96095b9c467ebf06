//! Desktop entry point for the webcam recorder.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

fn main() {
    camrec_lib::run();
}
