//! GDT text writer
//!
//! GDT files hold one or more named entries, each bound to a `.gdf`
//! definition and holding quoted key/value pairs:
//!
//! ```text
//! {
//! 	"name" ( "physpreset.gdf" )
//! 	{
//! 		"key" "value"
//! 	}
//! }
//! ```

use std::fmt::{Display, Write};

pub struct GdtWriter {
    out: String,
}

impl GdtWriter {
    pub fn new() -> Self {
        Self {
            out: String::from("{\n"),
        }
    }

    pub fn begin_entry(&mut self, name: &str, gdf: &str) -> &mut Self {
        let _ = writeln!(self.out, "\t\"{}\" ( \"{}\" )", name, gdf);
        self.out.push_str("\t{\n");
        self
    }

    pub fn field(&mut self, key: &str, value: impl Display) -> &mut Self {
        let _ = writeln!(self.out, "\t\t\"{}\" \"{}\"", key, value);
        self
    }

    pub fn end_entry(&mut self) -> &mut Self {
        self.out.push_str("\t}\n");
        self
    }

    /// Close the file and return its text
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n\n");
        self.out
    }
}

impl Default for GdtWriter {
    fn default() -> Self {
        Self::new()
    }
}
