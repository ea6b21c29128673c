mod parser;
mod reader;

pub use parser::{ManifestItem, OpfData, parse_container_xml, parse_nav, parse_ncx, parse_opf};
pub use reader::{read_epub, read_epub_from_reader};
