//! Handle lifecycle (§4.4, §4.8, §6.3): `init`, `close`, `stats`, and the public lookup
//! API that ties every other module together.

use std::cell::Cell;
use std::io::Cursor as IoCursor;
use std::path::{Path, PathBuf};

use tracing::{info_span, warn};

use super::binary;
use super::compare::{self, Ordering};
use super::digest::DigestBuilder;
use super::env::Environment;
use super::error::{DuplicateKind, Error, Result};
use super::filetype;
use super::lookup;
use super::mmap::MmapPool;
use super::resolver;
use super::sort;
use super::spec::{Label, Spec};
use super::stem::StemTable;
use super::subs::SubsTable;
use super::text;
use super::validate::{self, Validator};

/// `init(handle, options[])` (§6.3): the recognized option set.
#[derive(Default)]
pub struct Options {
    /// `PATH`, repeatable. Empty means "use `Environment::default_path`".
    pub paths: Vec<PathBuf>,
    /// `SUBSET`: only load specs whose pattern starts with this literal prefix.
    pub subset: Option<String>,
    /// `BASEONLY`: skip the `.homedirs`/`.local` overlay attempt.
    pub base_only: bool,
    /// `VALIDATE`: run context validation and `nodups_specs` during load.
    pub validating: bool,
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn subset(mut self, prefix: impl Into<String>) -> Self {
        self.subset = Some(prefix.into());
        self
    }

    pub fn base_only(mut self, value: bool) -> Self {
        self.base_only = value;
        self
    }

    pub fn validating(mut self, value: bool) -> Self {
        self.validating = value;
        self
    }
}

/// A loaded rule set (§3 "Handle"). Immutable after `init` except for per-spec match
/// counters and lazy-compile slots (§5); `close` is the only thing that mutates its own
/// storage, and only once (subsequent `close` calls are no-ops, §4.8, §8 property 8).
pub struct Handle {
    stems: StemTable,
    specs: Vec<Spec>,
    pool: MmapPool,
    subs: SubsTable,
    digest: [u8; 32],
    validator: Option<Box<Validator>>,
    closed: Cell<bool>,
}

impl Handle {
    /// `init` (§4.4). Loads primary specfile(s), substitution overlays, and (unless
    /// `base_only`) the `.homedirs`/`.local` overlays, then sorts the store.
    pub fn init(options: &Options, env: &Environment) -> Result<Self> {
        Self::init_with_validator(options, env, None)
    }

    pub fn init_with_validator(
        options: &Options,
        env: &Environment,
        validator: Option<Box<Validator>>,
    ) -> Result<Self> {
        // `Environment::validating` is the caller's process-wide default; a `true` on
        // either it or the per-call `Options::validating` turns validation on (§4.12).
        let validating = options.validating || env.validating;
        let _span = info_span!("fcontext::init", validating).entered();

        let mut stems = StemTable::new();
        let mut specs = Vec::new();
        let mut pool = MmapPool::new();
        let mut subs = SubsTable::new();
        let mut digest = DigestBuilder::new();

        let effective_paths: Vec<PathBuf> = if options.paths.is_empty() {
            vec![PathBuf::from(&env.default_path)]
        } else {
            options.paths.clone()
        };

        for path in &effective_paths {
            check_path_len(path, env)?;
            load_subs_overlay(path, "subs_dist", &mut subs)?;
            load_subs_overlay(path, "subs", &mut subs)?;
        }

        for path in &effective_paths {
            let loaded = resolver::process_file(path, None, |p| {
                load_one_specfile(p, &mut stems, &mut specs, &mut pool, &mut digest, options.subset.as_deref())
            })?;
            if loaded.is_none() {
                return Err(Error::Io {
                    path: path.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
        }

        if validating {
            let conflicts = nodups_specs(&specs, Some(&effective_paths[0]));
            if !conflicts.is_empty() {
                let (path, line, pattern, kind) = conflicts.into_iter().next().unwrap();
                return Err(Error::DuplicateSpec { path, line, pattern, kind });
            }
            for spec in &specs {
                validate::validate(&effective_paths[0], &spec.label.raw, validator.as_deref())?;
            }
        }

        if !options.base_only {
            if let Some(first) = effective_paths.first() {
                for overlay in ["homedirs", "local"] {
                    resolver::process_file(first, Some(overlay), |p| {
                        load_one_specfile(p, &mut stems, &mut specs, &mut pool, &mut digest, options.subset.as_deref())
                    })?;
                }
            }
        }

        sort::sort_specs(&mut specs);

        Ok(Handle {
            stems,
            specs,
            pool,
            subs,
            digest: digest.finish(),
            validator,
            closed: Cell::new(false),
        })
    }

    pub fn lookup(&self, key: &[u8], mode_mask: u32) -> Result<Option<Label>> {
        let _span = info_span!("fcontext::lookup").entered();
        self.assert_open();
        match lookup::lookup_common(&self.stems, &self.specs, key, mode_mask, false)? {
            Some(hit) if !hit.spec.label.is_none() => Ok(Some(hit.spec.label.clone())),
            _ => Ok(None),
        }
    }

    pub fn partial_match(&self, key: &[u8]) -> Result<bool> {
        self.assert_open();
        Ok(lookup::lookup_common(&self.stems, &self.specs, key, 0, true)?.is_some())
    }

    pub fn best_match(&self, key: &[u8], aliases: &[&[u8]], mode_mask: u32) -> Result<Option<Label>> {
        let _span = info_span!("fcontext::best_match").entered();
        self.assert_open();
        match lookup::best_match(&self.stems, &self.specs, key, aliases, mode_mask)? {
            Some(hit) if !hit.spec.label.is_none() => Ok(Some(hit.spec.label.clone())),
            _ => Ok(None),
        }
    }

    /// The alias table consulted by callers before `lookup`/`best_match` (§4.10),
    /// mirroring the teacher's `check_aliased`.
    pub fn substitute<'a>(&'a self, path: &'a str) -> &'a str {
        self.subs.get(path).unwrap_or(path)
    }

    pub fn cmp(&self, other: &Handle) -> Ordering {
        let _span = info_span!("fcontext::cmp").entered();
        compare::compare(&self.specs, &self.stems, &other.specs, &other.stems).0
    }

    /// `stats(handle)` (§6.3): emits a warning for every spec with zero matches since
    /// load. Returns the count, mostly so tests don't need to scrape log output.
    pub fn stats(&self) -> usize {
        let _span = info_span!("fcontext::stats").entered();
        let mut unused = 0;
        for spec in &self.specs {
            if spec.matches.get() == 0 {
                unused += 1;
                warn!(
                    pattern = %String::from_utf8_lossy(spec.pattern()),
                    context = %spec.label.raw,
                    "unused fcontext spec"
                );
            }
        }
        unused
    }

    /// Re-runs context validation (§6.2 `selabel_validate`) against the handle's own
    /// injected validator (or the permissive default), for callers that load specs
    /// without `VALIDATE` set but still want to spot-check a particular context later.
    pub fn validate_context(&self, path: &Path, context: &str) -> Result<()> {
        validate::validate(path, context, self.validator.as_deref())
    }

    pub fn digest(&self) -> &[u8; 32] {
        &self.digest
    }

    pub fn spec_count(&self) -> usize {
        self.specs.len()
    }

    pub fn stem_count(&self) -> usize {
        self.stems.len()
    }

    /// `close` (§4.8): idempotent. The first call drops every owned allocation (specs,
    /// stems, substitution table) and releases the tracked mmap pool; Rust's ownership
    /// model does the actual freeing, so this mostly just marks the handle inert and
    /// truncates the stores so a stray method call after `close` sees nothing.
    pub fn close(&mut self) {
        if self.closed.get() {
            return;
        }
        self.specs.clear();
        self.pool.clear();
        self.subs = SubsTable::new();
        self.closed.set(true);
    }

    fn assert_open(&self) {
        debug_assert!(!self.closed.get(), "use of fcontext::Handle after close()");
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.close();
    }
}

fn check_path_len(path: &Path, env: &Environment) -> Result<()> {
    if path.as_os_str().len() > env.path_max {
        return Err(Error::NameTooLong {
            path: path.to_path_buf(),
            max: env.path_max,
        });
    }
    Ok(())
}

fn load_subs_overlay(base: &Path, suffix: &str, subs: &mut SubsTable) -> Result<()> {
    let path = resolver::with_suffix(base, suffix);
    match std::fs::File::open(&path) {
        Ok(file) => subs.load(&path, file),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io { path, source }),
    }
}

/// Loads one resolved specfile path: mmaps it, folds its bytes into the digest, and
/// dispatches to the binary or text loader based on the magic-number peek (§4.3).
fn load_one_specfile(
    path: &Path,
    stems: &mut StemTable,
    specs: &mut Vec<Spec>,
    pool: &mut MmapPool,
    digest: &mut DigestBuilder,
    subset: Option<&str>,
) -> Result<()> {
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let region = super::mmap::MmapRegion::map_file(path, &file)?;
    digest.add_specfile(path, region.as_slice());

    // Loaded into a scratch vec first so the `SUBSET` filter (§6.3) can drop specs
    // whose pattern doesn't start with the requested prefix before they ever touch the
    // handle's real store.
    let mut loaded = Vec::new();
    let is_binary = binary::is_binary(region.as_slice());
    if is_binary {
        binary::load_binary(path, region.clone(), stems, &mut loaded)?;
    } else {
        let mut cursor = IoCursor::new(region.as_slice());
        text::load_text(path, &mut cursor, stems, &mut loaded)?;
    }
    if is_binary {
        pool.track(region);
    }

    match subset {
        Some(prefix) => specs.extend(
            loaded
                .into_iter()
                .filter(|s| s.pattern().starts_with(prefix.as_bytes())),
        ),
        None => specs.extend(loaded),
    }

    Ok(())
}

/// `nodups_specs` (§4.4): reports every pair of specs with identical `regex_str` and
/// compatible modes (either is 0, or both equal). Distinguishes same-context
/// ("redundant") from different-context ("conflicting"), per spec, naming the *later*
/// spec's position for the diagnostic.
fn nodups_specs(specs: &[Spec], path_for_diagnostics: Option<&PathBuf>) -> Vec<(PathBuf, usize, String, DuplicateKind)> {
    let mut found = Vec::new();
    for i in 0..specs.len() {
        for j in (i + 1)..specs.len() {
            let (a, b) = (&specs[i], &specs[j]);
            if a.pattern() != b.pattern() {
                continue;
            }
            let compatible = a.mode == 0 || b.mode == 0 || a.mode == b.mode;
            if !compatible {
                continue;
            }
            let kind = if a.label.raw == b.label.raw {
                DuplicateKind::Redundant
            } else {
                DuplicateKind::Conflicting
            };
            let path = path_for_diagnostics.cloned().unwrap_or_default();
            let pattern = String::from_utf8_lossy(a.pattern()).into_owned();
            warn!(%pattern, kind = %kind, "duplicate fcontext spec");
            found.push((path, j, pattern, kind));
        }
    }
    found
}

/// Convenience: mask an arbitrary mode value down to the file-type bits a caller
/// passes to `lookup`/`best_match` (re-exported so callers don't need to depend on the
/// `filetype` module directly for the common case).
pub fn mode_mask(mode: u32) -> u32 {
    filetype::mask(mode)
}
