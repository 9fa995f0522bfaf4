mod reader;
mod writer;

pub use self::reader::{ReadError, Reader};
pub use self::writer::Writer;
