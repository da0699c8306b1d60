//! ZIP container plumbing for OOXML packages.
//!
//! A package is consumed as an ordered sequence of [`Member`]s and produced
//! through a [`MemberSink`]. [`PackageReader`] and [`ZipSink`] are the ZIP
//! backed implementations; `Vec<Member>` is an in-memory sink.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// ZIP entry metadata carried from input to output.
#[derive(Debug, Clone, Copy)]
pub struct MemberAttributes {
    /// Compression method of the source entry
    pub compression: CompressionMethod,
    /// Last modification timestamp
    pub last_modified: Option<DateTime>,
    /// Unix permission bits
    pub unix_mode: Option<u32>,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

impl Default for MemberAttributes {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
            last_modified: None,
            unix_mode: None,
            is_dir: false,
        }
    }
}

/// One named entry of a package.
#[derive(Debug, Clone)]
pub struct Member {
    /// Entry name (e.g., "xl/worksheets/sheet1.xml")
    pub path: String,
    /// Uncompressed entry bytes
    pub data: Vec<u8>,
    /// Entry metadata
    pub attributes: MemberAttributes,
}

impl Member {
    /// Create a member with default attributes.
    pub fn new(path: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            attributes: MemberAttributes::default(),
        }
    }

    /// Same name and attributes, new content.
    pub fn with_data(&self, data: Vec<u8>) -> Self {
        Self {
            path: self.path.clone(),
            data,
            attributes: self.attributes,
        }
    }
}

/// Destination for output members, written strictly in order.
pub trait MemberSink {
    /// Append one member.
    fn write_member(&mut self, member: &Member) -> Result<()>;
}

impl MemberSink for Vec<Member> {
    fn write_member(&mut self, member: &Member) -> Result<()> {
        self.push(member.clone());
        Ok(())
    }
}

impl<S: MemberSink + ?Sized> MemberSink for &mut S {
    fn write_member(&mut self, member: &Member) -> Result<()> {
        (**self).write_member(member)
    }
}

/// A [`MemberSink`] that appends entries to a ZIP archive.
///
/// The central directory is written only by [`ZipSink::finish`]. A sink
/// dropped without `finish` leaves the entries written so far with no
/// central directory, which no ZIP reader accepts.
pub struct ZipSink<W: Write + Seek> {
    zip: Option<ZipWriter<Guarded<W>>>,
    abandoned: Arc<AtomicBool>,
}

impl<W: Write + Seek> ZipSink<W> {
    /// Start a new archive on `writer`.
    pub fn new(writer: W) -> Self {
        let abandoned = Arc::new(AtomicBool::new(false));
        let guarded = Guarded {
            inner: writer,
            abandoned: Arc::clone(&abandoned),
        };
        Self {
            zip: Some(ZipWriter::new(guarded)),
            abandoned,
        }
    }

    /// Write the central directory and return the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        let zip = self.writer_taken()?;
        Ok(zip.finish()?.inner)
    }

    fn writer(&mut self) -> Result<&mut ZipWriter<Guarded<W>>> {
        self.zip
            .as_mut()
            .ok_or_else(|| Error::ZipArchive("archive already finished".into()))
    }

    fn writer_taken(&mut self) -> Result<ZipWriter<Guarded<W>>> {
        self.zip
            .take()
            .ok_or_else(|| Error::ZipArchive("archive already finished".into()))
    }
}

impl<W: Write + Seek> Drop for ZipSink<W> {
    fn drop(&mut self) {
        // `ZipWriter` finalizes on drop; refuse its writes so that an
        // unfinished archive never gains a central directory.
        if self.zip.is_some() {
            self.abandoned.store(true, Ordering::Relaxed);
        }
    }
}

/// Writer that fails every write once its [`ZipSink`] is abandoned.
struct Guarded<W> {
    inner: W,
    abandoned: Arc<AtomicBool>,
}

impl<W> Guarded<W> {
    fn check(&self) -> std::io::Result<()> {
        if self.abandoned.load(Ordering::Relaxed) {
            return Err(std::io::Error::other("archive abandoned before finish"));
        }
        Ok(())
    }
}

impl<W: Write> Write for Guarded<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.check()?;
        self.inner.flush()
    }
}

impl<W: Seek> Seek for Guarded<W> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.check()?;
        self.inner.seek(pos)
    }
}

impl<W: Write + Seek> MemberSink for ZipSink<W> {
    fn write_member(&mut self, member: &Member) -> Result<()> {
        let attrs = &member.attributes;
        // Only stored and deflated entries are rewritten as-is
        let compression = match attrs.compression {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };

        let mut options = SimpleFileOptions::default().compression_method(compression);
        if let Some(dt) = attrs.last_modified {
            options = options.last_modified_time(dt);
        }
        if let Some(mode) = attrs.unix_mode {
            options = options.unix_permissions(mode);
        }

        let zip = self.writer()?;
        if attrs.is_dir {
            zip.add_directory(member.path.as_str(), options)?;
            return Ok(());
        }

        zip.start_file(member.path.as_str(), options)?;
        zip.write_all(&member.data)?;
        Ok(())
    }
}

/// Fix XML encoding declaration from UTF-16 to UTF-8.
///
/// When we decode UTF-16 XML to a Rust String (UTF-8), the XML declaration
/// still says encoding="UTF-16". This causes quick-xml to fail when it tries
/// to re-interpret the already-decoded UTF-8 string as UTF-16.
fn fix_xml_encoding_declaration(content: &str) -> String {
    if content.starts_with("<?xml") {
        if let Some(end_decl) = content.find("?>") {
            let decl = &content[..end_decl + 2];
            let rest = &content[end_decl + 2..];

            let fixed_decl = decl
                .replace("encoding=\"UTF-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='UTF-16'", "encoding='UTF-8'")
                .replace("encoding=\"utf-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='utf-16'", "encoding='UTF-8'");

            return format!("{}{}", fixed_decl, rest);
        }
    }
    content.to_string()
}

/// Decode XML bytes handling different encodings (UTF-8, UTF-16 LE/BE).
///
/// OOXML parts are typically UTF-8 encoded, but some (especially older
/// or non-standard documents) may use UTF-16 encoding. Parts that are
/// patched are always written back as UTF-8.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        return String::from_utf8(bytes[3..].to_vec())
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {}", e)));
    }

    if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        let content = decode_utf16_le(&bytes[2..])?;
        return Ok(fix_xml_encoding_declaration(&content));
    }

    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let content = decode_utf16_be(&bytes[2..])?;
        return Ok(fix_xml_encoding_declaration(&content));
    }

    match String::from_utf8(bytes.to_vec()) {
        Ok(s) => Ok(s),
        Err(e) => {
            // UTF-16 without BOM has null bytes in every other position for ASCII
            if bytes.len() >= 4 && bytes[1] == 0 && bytes[3] == 0 {
                decode_utf16_le(bytes).map(|c| fix_xml_encoding_declaration(&c))
            } else if bytes.len() >= 4 && bytes[0] == 0 && bytes[2] == 0 {
                decode_utf16_be(bytes).map(|c| fix_xml_encoding_declaration(&c))
            } else {
                Err(Error::XmlParse(format!("invalid UTF-8: {}", e)))
            }
        }
    }
}

/// Decode UTF-16 Little Endian bytes to String.
fn decode_utf16_le(bytes: &[u8]) -> Result<String> {
    let len = bytes.len() & !1;

    let u16_iter = (0..len)
        .step_by(2)
        .map(|i| u16::from_le_bytes([bytes[i], bytes[i + 1]]));

    char::decode_utf16(u16_iter)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::XmlParse(format!("invalid UTF-16: {}", e)))
}

/// Decode UTF-16 Big Endian bytes to String.
fn decode_utf16_be(bytes: &[u8]) -> Result<String> {
    let len = bytes.len() & !1;

    let u16_iter = (0..len)
        .step_by(2)
        .map(|i| u16::from_be_bytes([bytes[i], bytes[i + 1]]));

    char::decode_utf16(u16_iter)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::XmlParse(format!("invalid UTF-16: {}", e)))
}

/// Read access to the entries of an OOXML package.
pub struct PackageReader {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl PackageReader {
    /// Open a package from a file path.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use xlsxpatch::container::PackageReader;
    ///
    /// let reader = PackageReader::open("report.xlsx")?;
    /// println!("{} entries", reader.len());
    /// # Ok::<(), xlsxpatch::Error>(())
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let mut reader = BufReader::new(file);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(data)
    }

    /// Create a package reader from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let cursor = Cursor::new(data);
        let archive = ZipArchive::new(cursor)?;
        Ok(Self { archive })
    }

    /// Number of entries, directories included.
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Check if an entry exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        self.archive.file_names().any(|n| n == path)
    }

    /// Entry names in central directory order.
    pub fn list_files(&self) -> Vec<String> {
        self.archive.file_names().map(String::from).collect()
    }

    /// Read an entry's bytes by name.
    pub fn read_binary(&mut self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .archive
            .by_name(path)
            .map_err(|_| Error::MissingComponent(path.to_string()))?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Read an XML entry as a string, handling UTF-8/UTF-16.
    pub fn read_xml(&mut self, path: &str) -> Result<String> {
        let bytes = self.read_binary(path)?;
        decode_xml_bytes(&bytes)
    }

    /// Read the entry at `index` with its attributes.
    pub fn read_member(&mut self, index: usize) -> Result<Member> {
        let mut file = self.archive.by_index(index)?;

        let attributes = MemberAttributes {
            compression: file.compression(),
            last_modified: file.last_modified(),
            unix_mode: file.unix_mode(),
            is_dir: file.is_dir(),
        };
        let path = file.name().to_string();

        let mut data = Vec::new();
        if !attributes.is_dir {
            file.read_to_end(&mut data)?;
        }

        Ok(Member {
            path,
            data,
            attributes,
        })
    }

    /// Iterate over all entries in archive order.
    pub fn members(&mut self) -> Members<'_> {
        Members {
            reader: self,
            index: 0,
        }
    }
}

impl std::fmt::Debug for PackageReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageReader")
            .field("files", &self.archive.len())
            .finish()
    }
}

/// Iterator over the entries of a [`PackageReader`].
pub struct Members<'a> {
    reader: &'a mut PackageReader,
    index: usize,
}

impl Iterator for Members<'_> {
    type Item = Result<Member>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.reader.len() {
            return None;
        }
        let member = self.reader.read_member(self.index);
        self.index += 1;
        Some(member)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.reader.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}
