/// Byte cursor with per-format integer order.
pub mod reader;
/// Reopenable byte origins (memory, file).
pub mod source;
/// Scratch writer for synthesized frame images.
pub mod writer;
