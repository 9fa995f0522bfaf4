/*!
    GY/T 277-2014 internet-TV DRM license format.

    Covers the tag-length-value unit taxonomy, the big-endian encoders
    for every unit kind, and the two license assemblies (the GY/T 277
    baseline and the ChinaDRM variant with a Content unit). Only the
    encoding direction is implemented; issued licenses are consumed by
    client devices, not read back by the server.
*/

mod error;

pub mod license;
pub mod units;

pub use self::error::FormatError;
