use crate::errors::{Error, FsAction, Result};
use crate::patterns::{PatternMatcher, ReplacePolicy};
use encoding_rs::{CoderResult, Encoding, UTF_16BE, UTF_16LE};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tempfile::{NamedTempFile, PathPersistError, TempPath};
use tracing::{debug, warn};

const CHUNK_SIZE: usize = 64 * 1024;

/// Rewrites file contents line by line through a [`PatternMatcher`].
///
/// Each file is decoded with the configured encoding, transformed into a fresh
/// temporary file in the same directory, and then moved over the original.
/// Lines are re-joined with `\n` regardless of the source terminator.
pub struct ContentRewriter<'a> {
    matcher: &'a PatternMatcher,
    policy: ReplacePolicy,
    encoding: &'static Encoding,
    dry_run: bool,
}

/// The result of rewriting a single file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Number of substitutions made in the file.
    pub substitutions: usize,
    /// `true` if the original file was replaced by the rewritten copy
    /// (always `false` on a dry run).
    pub modified: bool,
    /// `true` if malformed or unmappable characters were replaced while transcoding.
    pub lossy: bool,
}

/// Per-file state while lines are streamed through the matcher.
#[derive(Default)]
struct LineState {
    /// Set once the single allowed substitution of a replace-first pass happened.
    replaced_first: bool,
    substitutions: usize,
    lossy: bool,
}

impl<'a> ContentRewriter<'a> {
    pub fn new(
        matcher: &'a PatternMatcher,
        policy: ReplacePolicy,
        encoding: &'static Encoding,
        dry_run: bool,
    ) -> Self {
        Self {
            matcher,
            policy,
            encoding,
            dry_run,
        }
    }

    /// Rewrites `path` in place.
    ///
    /// The original is always replaced, so line terminators are normalized even
    /// when nothing matched. Both file handles are closed before the swap.
    pub fn rewrite(&self, path: &Path) -> Result<RewriteOutcome> {
        let source = File::open(path).map_err(|e| Error::fs(FsAction::Read, path, e))?;

        if self.dry_run {
            let state = self.transcode(path, source, &mut io::sink())?;
            return Ok(RewriteOutcome {
                substitutions: state.substitutions,
                modified: false,
                lossy: state.lossy,
            });
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(parent).map_err(|e| Error::fs(FsAction::CreateTemp, path, e))?;

        let mut writer = BufWriter::new(temp);
        let state = self.transcode(path, source, &mut writer)?;
        let temp = writer
            .into_inner()
            .map_err(|e| Error::fs(FsAction::Write, path, e.into_error()))?;

        if state.substitutions == 0 {
            debug!("No matches in {}", path.display());
        }

        // Preserve file permissions
        let perms = fs::metadata(path)
            .map_err(|e| Error::fs(FsAction::Inspect, path, e))?
            .permissions();
        fs::set_permissions(temp.path(), perms).map_err(|e| Error::fs(FsAction::Write, temp.path(), e))?;

        swap_into_place(temp.into_temp_path(), path)?;
        Ok(RewriteOutcome {
            substitutions: state.substitutions,
            modified: true,
            lossy: state.lossy,
        })
    }

    /// Streams `source` through the matcher into `sink`, one line at a time.
    fn transcode<R: Read, W: Write>(&self, path: &Path, mut source: R, sink: &mut W) -> Result<LineState> {
        let mut decoder = self.encoding.new_decoder_without_bom_handling();
        let mut state = LineState::default();
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut pending = String::new();

        loop {
            let read = match source.read(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::fs(FsAction::Read, path, e)),
            };
            let last = read == 0;

            let mut input = &chunk[..read];
            loop {
                let needed = decoder
                    .max_utf8_buffer_length(input.len())
                    .unwrap_or(input.len() * 3 + 16);
                pending.reserve(needed);
                let (result, consumed, malformed) = decoder.decode_to_string(input, &mut pending, last);
                state.lossy |= malformed;
                input = &input[consumed..];
                if let CoderResult::InputEmpty = result {
                    break;
                }
            }

            let mut start = 0;
            while let Some(offset) = pending[start..].find('\n') {
                let end = start + offset;
                let line = &pending[start..end];
                self.emit_line(path, line.strip_suffix('\r').unwrap_or(line), &mut state, sink)?;
                start = end + 1;
            }
            pending.drain(..start);

            if last {
                break;
            }
        }

        if !pending.is_empty() {
            let line = pending.strip_suffix('\r').unwrap_or(pending.as_str());
            self.emit_line(path, line, &mut state, sink)?;
        }

        if state.lossy {
            warn!(
                "{} is not valid {}; malformed sequences were replaced",
                path.display(),
                self.encoding.name()
            );
        }

        Ok(state)
    }

    fn emit_line<W: Write>(&self, path: &Path, line: &str, state: &mut LineState, sink: &mut W) -> Result<()> {
        let line = self.rewrite_line(line, state);
        let (bytes, unmappable) = encode(self.encoding, &line);
        state.lossy |= unmappable;
        let (newline, _) = encode(self.encoding, "\n");

        sink.write_all(&bytes)
            .and_then(|_| sink.write_all(&newline))
            .map_err(|e| Error::fs(FsAction::Write, path, e))
    }

    fn rewrite_line<'l>(&self, line: &'l str, state: &mut LineState) -> Cow<'l, str> {
        match self.policy {
            ReplacePolicy::All => {
                let count = self.matcher.count_matches(line);
                if count == 0 {
                    return Cow::Borrowed(line);
                }
                state.substitutions += count;
                self.matcher.replace_all(line)
            }
            ReplacePolicy::First => {
                if state.replaced_first || !self.matcher.is_match(line) {
                    return Cow::Borrowed(line);
                }
                state.replaced_first = true;
                state.substitutions += 1;
                self.matcher.replace_first(line)
            }
        }
    }
}

/// Encodes `text` with `encoding`, returning the bytes and whether any
/// character had to be replaced.
///
/// UTF-16 is written as UTF-16; `Encoding::encode` would fall back to UTF-8.
fn encode<'t>(encoding: &'static Encoding, text: &'t str) -> (Cow<'t, [u8]>, bool) {
    if encoding == UTF_16LE {
        (Cow::Owned(text.encode_utf16().flat_map(u16::to_le_bytes).collect()), false)
    } else if encoding == UTF_16BE {
        (Cow::Owned(text.encode_utf16().flat_map(u16::to_be_bytes).collect()), false)
    } else {
        let (bytes, _, unmappable) = encoding.encode(text);
        (bytes, unmappable)
    }
}

/// Moves the rewritten `temp` file over `target`.
///
/// An atomic rename-over is tried first. If the platform refuses it, the
/// original is deleted and the rename retried.
fn swap_into_place(temp: TempPath, target: &Path) -> Result<()> {
    match temp.persist(target) {
        Ok(()) => Ok(()),
        Err(PathPersistError { error, path }) => {
            warn!(
                "Atomic replace of {} failed ({}); falling back to delete and rename",
                target.display(),
                error
            );
            replace_by_removal(path, target)
        }
    }
}

/// Deletes `target` (a missing target is fine) and renames `temp` onto it.
///
/// Should the rename fail, the temporary file is kept on disk and named in
/// the error so its contents can be recovered.
fn replace_by_removal(temp: TempPath, target: &Path) -> Result<()> {
    match fs::remove_file(target) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::fs(FsAction::Remove, target, e)),
    }

    match temp.persist(target) {
        Ok(()) => Ok(()),
        Err(PathPersistError { error, path }) => {
            let orphan = match path.keep() {
                Ok(kept) => kept,
                Err(e) => e.path.to_path_buf(),
            };
            Err(Error::SwapFailed {
                path: target.to_path_buf(),
                orphan,
                source: error,
            })
        }
    }
}
