pub mod client_ext;
pub mod fs;

pub use crate::client_ext::util::ClientUtilExt as Util;
pub use crate::fs::{read_json, write_json};
