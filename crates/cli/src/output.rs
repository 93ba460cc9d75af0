//! Printing of lockdownd values
//!
//! Two formats: indented `Key: value` text (the default) and an XML
//! property-list document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use plist::Value;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    KeyValue,
    Xml,
}

/// Write `value` in the requested format
pub fn write_value<W: Write>(out: &mut W, value: &Value, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::KeyValue => write_key_value(out, value),
        OutputFormat::Xml => write_xml(out, value),
    }
}

/// Write `value` as indented `Key: value` lines
///
/// Nested dictionaries and arrays are introduced by `Key:` on a line of its
/// own, with their children indented by one more space. Array elements are
/// keyed by index.
pub fn write_key_value<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    match value {
        Value::Dictionary(_) | Value::Array(_) => write_children(out, value, 0),
        scalar => writeln!(out, "{}", scalar_to_string(scalar)),
    }
}

/// Write `value` as an XML plist document
pub fn write_xml<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let mut buf = Vec::new();
    value.to_writer_xml(&mut buf).map_err(io::Error::other)?;
    if !buf.ends_with(b"\n") {
        buf.push(b'\n');
    }
    out.write_all(&buf)
}

fn write_children<W: Write>(out: &mut W, value: &Value, indent: usize) -> io::Result<()> {
    match value {
        Value::Dictionary(dict) => {
            for (key, child) in dict {
                write_entry(out, key, child, indent)?;
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                write_entry(out, &i.to_string(), child, indent)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn write_entry<W: Write>(out: &mut W, key: &str, child: &Value, indent: usize) -> io::Result<()> {
    if is_container(child) {
        writeln!(out, "{:indent$}{}:", "", key, indent = indent)?;
        write_children(out, child, indent + 1)
    } else {
        writeln!(
            out,
            "{:indent$}{}: {}",
            "",
            key,
            scalar_to_string(child),
            indent = indent
        )
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Dictionary(_) | Value::Array(_))
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => match i.as_signed() {
            Some(n) => n.to_string(),
            None => i.as_unsigned().map(|n| n.to_string()).unwrap_or_default(),
        },
        Value::Real(r) => format!("{:.6}", r),
        Value::String(s) => s.clone(),
        Value::Data(bytes) => STANDARD.encode(bytes),
        Value::Date(date) => date.to_xml_format(),
        Value::Uid(uid) => uid.get().to_string(),
        _ => String::new(),
    }
}
