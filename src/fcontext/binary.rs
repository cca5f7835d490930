//! The binary loader (§4.1, §6.1): parses a compiled rule file out of a mapped region,
//! validating magic, version, and regex-engine ABI fingerprint along the way.
//!
//! Version gates, oldest to newest: `PCRE_VERS` (regex engine version string present),
//! `MODE_VERS` (mode field's documented type widened from `mode_t` to `u32`, same 4
//! bytes on the wire either way), `REGEX_ARCH_VERS` (arch fingerprint, blob adoption),
//! `PREFIX_LEN_VERS` (`prefix_len` stored rather than recomputed).

use std::path::Path;
use std::rc::Rc;

use super::error::{Error, Result};
use super::mmap::{ByteString, MmapRegion};
use super::regex_engine::{self, CompiledRegex};
use super::spec::{self, Label, RegexSlot, Spec};
use super::stem::StemTable;

pub const MAGIC: u32 = 0xf97c_ff8a;
pub const PCRE_VERS: u32 = 1;
pub const MODE_VERS: u32 = 2;
pub const REGEX_ARCH_VERS: u32 = 3;
pub const PREFIX_LEN_VERS: u32 = 4;
pub const MAX_KNOWN_VERSION: u32 = PREFIX_LEN_VERS;

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], path: &'a Path) -> Self {
        Cursor { bytes, pos: 0, path }
    }

    fn overrun(&self, detail: &str) -> Error {
        Error::Format {
            path: self.path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.bytes.len() - self.pos {
            return Err(self.overrun(&format!(
                "declared length {len} overruns region ({} bytes remaining)",
                self.bytes.len() - self.pos
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.bytes[start..start + len])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn i32(&mut self) -> Result<i32> {
        Ok(self.u32()? as i32)
    }
}

/// Reads a NUL-terminated byte string of declared length `len` (the NUL *included* in
/// `len`, per §6.1's `stem_bytes`/`ctx_bytes`/`regex_bytes` framing). Returns the offset
/// of the string's first byte (for building a [`ByteString::Borrowed`]) and the
/// content length *excluding* the trailing NUL.
fn take_nul_terminated<'a>(cursor: &mut Cursor<'a>, len: usize, what: &str) -> Result<(usize, &'a [u8])> {
    let start = cursor.pos;
    let bytes = cursor.take(len)?;
    if bytes.last() != Some(&0) {
        return Err(cursor.overrun(&format!("{what} at offset {start} is missing a trailing NUL")));
    }
    Ok((start, &bytes[..len - 1]))
}

pub fn load_binary(
    path: &Path,
    region: Rc<MmapRegion>,
    stems: &mut StemTable,
    specs: &mut Vec<Spec>,
) -> Result<()> {
    let bytes = region.as_slice();
    let mut cursor = Cursor::new(bytes, path);

    let magic = cursor.u32()?;
    if magic != MAGIC {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: format!("bad magic 0x{magic:08x}"),
        });
    }

    let version = cursor.u32()?;
    if version > MAX_KNOWN_VERSION {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: format!("version {version} exceeds maximum known {MAX_KNOWN_VERSION}"),
        });
    }

    let mut arch_ok = false;
    if version >= PCRE_VERS {
        let reg_ver_len = cursor.u32()? as usize;
        let reg_ver = cursor.take(reg_ver_len)?;
        let host_ver = regex_engine::engine_version();
        if reg_ver != host_ver.as_bytes() {
            return Err(Error::VersionMismatch {
                path: path.to_path_buf(),
                file: String::from_utf8_lossy(reg_ver).into_owned(),
                host: host_ver.to_string(),
            });
        }

        if version >= REGEX_ARCH_VERS {
            let arch_len = cursor.u32()? as usize;
            let arch = cursor.take(arch_len)?;
            let host_arch = regex_engine::engine_arch_string();
            arch_ok = arch == host_arch.as_bytes();
        }
    }

    let stem_count = cursor.u32()?;
    if stem_count == 0 {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: "stem_count is zero".to_string(),
        });
    }

    let mut file_to_handle_stem = Vec::with_capacity(stem_count as usize);
    for _ in 0..stem_count {
        let stem_len = cursor.u32()? as usize;
        if stem_len == 0 || stem_len == u32::MAX as usize {
            return Err(Error::Format {
                path: path.to_path_buf(),
                detail: format!("invalid stem length {stem_len}"),
            });
        }
        let (offset, content) = take_nul_terminated(&mut cursor, stem_len + 1, "stem")?;
        let handle_id = stems.intern(content, || ByteString::borrowed(region.clone(), offset, stem_len));
        file_to_handle_stem.push(handle_id);
    }

    let spec_count = cursor.u32()?;
    if spec_count == 0 {
        return Err(Error::Format {
            path: path.to_path_buf(),
            detail: "spec_count is zero".to_string(),
        });
    }

    for _ in 0..spec_count {
        let ctx_len = cursor.u32()? as usize;
        if ctx_len == 0 {
            return Err(Error::Format {
                path: path.to_path_buf(),
                detail: "context length is zero".to_string(),
            });
        }
        let (_, ctx_content) = take_nul_terminated(&mut cursor, ctx_len, "context string")?;
        let ctx = std::str::from_utf8(ctx_content)
            .map_err(|_| Error::Format {
                path: path.to_path_buf(),
                detail: "context string is not valid UTF-8".to_string(),
            })?
            .to_string();

        let regex_len = cursor.u32()? as usize;
        if regex_len == 0 {
            return Err(Error::Format {
                path: path.to_path_buf(),
                detail: "regex length is zero".to_string(),
            });
        }
        let (regex_offset, regex_content) = take_nul_terminated(&mut cursor, regex_len, "regex string")?;

        // `mode_t` is a 4-byte unsigned int on Linux even before MODE_VERS widened the
        // field's documented type; both branches read the same 4 bytes.
        let mode = cursor.u32()?;

        let raw_stem_id = cursor.i32()?;
        let stem_id = if raw_stem_id < 0 || raw_stem_id as usize >= file_to_handle_stem.len() {
            -1
        } else {
            file_to_handle_stem[raw_stem_id as usize]
        };

        let has_meta_chars = cursor.u32()? != 0;

        let prefix_len = if version >= PREFIX_LEN_VERS {
            cursor.u32()? as usize
        } else {
            spec::prefix_len(regex_content)
        };

        let blob_len = cursor.u32()? as usize;
        let blob = cursor.take(blob_len)?;
        let regex_slot = if arch_ok {
            match CompiledRegex::from_bytes(blob) {
                Some(compiled) => RegexSlot::already_compiled(compiled),
                None => RegexSlot::uncompiled(),
            }
        } else {
            RegexSlot::uncompiled()
        };

        specs.push(Spec {
            regex_str: ByteString::borrowed(region.clone(), regex_offset, regex_len - 1),
            regex: regex_slot,
            stem_id,
            mode,
            label: Label::new(ctx),
            has_meta_chars,
            prefix_len,
            from_mmap: true,
            matches: std::cell::Cell::new(0),
        });
    }

    Ok(())
}

/// Peeks the first 4 bytes of `bytes` to decide binary vs. text (§4.3). Fewer than 4
/// bytes is never binary.
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && u32::from_le_bytes(bytes[0..4].try_into().unwrap()) == MAGIC
}
