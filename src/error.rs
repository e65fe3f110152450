use std::{io, result};

use gltf;

#[cfg_attr(rustfmt, rustfmt_skip)]
quick_error! {
    #[doc = "Errors surfaced by avatar loading, retargeting and detection."]
    #[derive(Debug)]
    pub enum Error {
        #[doc = "Standard I/O error."]
        Io(err: io::Error) {
            from()
            description("I/O error")
            display("I/O error: {}", err)
            cause(err)
        }

        #[doc = "The glTF document could not be imported."]
        Gltf(err: gltf::Error) {
            from()
            description("glTF import error")
            display("glTF import error: {}", err)
            cause(err)
        }

        #[doc = "A pose matrix did not have exactly 16 elements."]
        MalformedMatrix(len: usize) {
            description("malformed pose matrix")
            display("pose matrix must have 16 elements, got {}", len)
        }

        #[doc = "Retarget scale factor was zero, negative or not finite."]
        InvalidScale(scale: f32) {
            description("invalid retarget scale")
            display("retarget scale must be positive, got {}", scale)
        }

        #[doc = "The asset loader does not understand the given URL."]
        UnsupportedUrl(url: String) {
            description("unsupported asset URL")
            display("unsupported asset URL: {}", url)
        }

        #[doc = "The inference service failed to process a frame."]
        Detect(message: String) {
            description("detection failed")
            display("detection failed: {}", message)
        }

        #[doc = "The camera or video source could not be acquired."]
        Acquire(message: String) {
            description("video acquisition failed")
            display("video acquisition failed: {}", message)
        }

        #[doc = "The background loader went away before delivering its result."]
        LoaderGone {
            description("asset loader disconnected")
            display("asset loader disconnected before finishing")
        }
    }
}

/// Result type used throughout `mimic`.
pub type Result<T> = result::Result<T, Error>;
