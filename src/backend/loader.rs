// Symbol loader - driver library and entry point resolution
//
// Two phases:
// - load(): open the driver library and resolve the library-scope tiers
// - resolve_instance_symbols(): resolve the instance-scope tiers through
//   vkGetInstanceProcAddr once an instance exists
//
// The resolved vkGetInstanceProcAddr also seeds the ash entry, so every typed
// ash call goes through entry points resolved (and audited) here.

use ash::vk;
use std::collections::HashMap;
use std::ffi::CStr;

use super::error::LoadError;
use super::symbols::{
    SymbolDecl, SymbolScope, SymbolTier, DRIVER_LIBRARY_NAME, GET_INSTANCE_PROC_ADDR,
    INSTANCE_TIERS, LIBRARY_TIERS,
};

/// Untyped driver entry point.
pub type RawProc = unsafe extern "system" fn();

/// An opened driver library.
pub trait DriverLibrary {
    /// Look up an exported symbol by name.
    fn symbol(&self, name: &CStr) -> Option<RawProc>;
}

/// Opens driver libraries by file name.
pub trait LibraryOpener {
    fn open(&self, name: &str) -> Result<Box<dyn DriverLibrary>, String>;
}

/// Opens libraries through the OS dynamic loader search path.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLibraries;

struct NativeLibrary(libloading::Library);

impl DriverLibrary for NativeLibrary {
    fn symbol(&self, name: &CStr) -> Option<RawProc> {
        unsafe {
            self.0
                .get::<RawProc>(name.to_bytes_with_nul())
                .ok()
                .map(|symbol| *symbol)
        }
    }
}

impl LibraryOpener for SystemLibraries {
    fn open(&self, name: &str) -> Result<Box<dyn DriverLibrary>, String> {
        let library = unsafe { libloading::Library::new(name) }.map_err(|e| e.to_string())?;
        Ok(Box::new(NativeLibrary(library)))
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedSymbol {
    tier: SymbolTier,
    proc: RawProc,
}

/// Resolved entry points, keyed by name.
#[derive(Debug, Default)]
pub struct SymbolTable {
    resolved: HashMap<&'static CStr, ResolvedSymbol>,
    missing_optional: Vec<SymbolDecl>,
}

impl SymbolTable {
    pub fn get(&self, name: &CStr) -> Option<RawProc> {
        self.resolved.get(name).map(|symbol| symbol.proc)
    }

    pub fn contains(&self, name: &CStr) -> bool {
        self.resolved.contains_key(name)
    }

    /// Fetch an entry point as its typed function pointer.
    ///
    /// # Safety
    /// `F` must be the `vk::PFN_*` type that matches `name`.
    pub unsafe fn typed<F: Copy>(&self, name: &CStr) -> Option<F> {
        debug_assert_eq!(std::mem::size_of::<F>(), std::mem::size_of::<RawProc>());
        self.get(name)
            .map(|proc| std::mem::transmute_copy::<RawProc, F>(&proc))
    }

    /// Number of resolved symbols in `tier`.
    pub fn tier_len(&self, tier: SymbolTier) -> usize {
        self.resolved.values().filter(|s| s.tier == tier).count()
    }

    /// Optional symbols the driver did not provide.
    pub fn missing_optional(&self) -> &[SymbolDecl] {
        &self.missing_optional
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    fn merge(&mut self, resolved: Vec<(SymbolDecl, RawProc)>, missing: Vec<SymbolDecl>) {
        for (decl, proc) in resolved {
            self.resolved.insert(decl.name, ResolvedSymbol { tier: decl.tier, proc });
        }
        self.missing_optional.extend(missing);
    }

    fn drop_scope(&mut self, scope: SymbolScope) {
        self.resolved.retain(|_, symbol| symbol.tier.scope() != scope);
        self.missing_optional.retain(|decl| decl.tier.scope() != scope);
    }

    fn clear(&mut self) {
        self.resolved.clear();
        self.missing_optional.clear();
    }
}

/// Resolve one declared tier with `lookup`.
///
/// Returns the resolved entries and the optional misses. A required tier
/// fails as a whole; each miss is logged before the first one is reported.
pub fn resolve_tier(
    decls: &[SymbolDecl],
    mut lookup: impl FnMut(&CStr) -> Option<RawProc>,
) -> Result<(Vec<(SymbolDecl, RawProc)>, Vec<SymbolDecl>), LoadError> {
    let mut resolved = Vec::with_capacity(decls.len());
    let mut missing = Vec::new();

    for decl in decls {
        match lookup(decl.name) {
            Some(proc) => resolved.push((*decl, proc)),
            None if decl.is_optional() => {
                log::warn!("Optional {} entry point {:?} not available", decl.tier, decl.name);
                missing.push(*decl);
            }
            None => {
                log::error!("Unable to load {} entry point {:?}", decl.tier, decl.name);
                missing.push(*decl);
            }
        }
    }

    if let Some(first) = missing.iter().find(|decl| !decl.is_optional()) {
        return Err(LoadError::EntryPointMissing {
            tier: first.tier,
            name: first.name.to_string_lossy().into_owned(),
        });
    }

    Ok((resolved, missing))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoaderStage {
    Unloaded,
    Loaded,
    InstanceResolved,
}

/// Owns the driver library and the symbol table resolved from it.
pub struct SymbolLoader {
    opener: Box<dyn LibraryOpener>,
    library_name: String,
    library: Option<Box<dyn DriverLibrary>>,
    table: SymbolTable,
    stage: LoaderStage,
}

impl SymbolLoader {
    /// Loader for the platform's Vulkan loader library.
    pub fn system() -> Self {
        Self::new(Box::new(SystemLibraries), DRIVER_LIBRARY_NAME)
    }

    pub fn new(opener: Box<dyn LibraryOpener>, library_name: &str) -> Self {
        Self {
            opener,
            library_name: library_name.to_owned(),
            library: None,
            table: SymbolTable::default(),
            stage: LoaderStage::Unloaded,
        }
    }

    /// Open the driver library and resolve the library-scope tiers.
    ///
    /// Calling this again while loaded returns the existing table.
    pub fn load(&mut self) -> Result<&SymbolTable, LoadError> {
        if self.library.is_some() {
            return Ok(&self.table);
        }

        log::info!("Loading driver library {}", self.library_name);
        let library = self
            .opener
            .open(&self.library_name)
            .map_err(|reason| LoadError::LibraryLoadFailure {
                name: self.library_name.clone(),
                reason,
            })?;

        let mut table = SymbolTable::default();
        for decls in LIBRARY_TIERS {
            // Dropping `library` here unloads it; nothing partial survives.
            let (resolved, missing) = resolve_tier(decls, |name| library.symbol(name))?;
            table.merge(resolved, missing);
        }

        log::debug!(
            "Resolved {} base entry points ({} optional missing)",
            table.tier_len(SymbolTier::Base) + table.tier_len(SymbolTier::OptionalBase),
            table.missing_optional().len()
        );

        self.library = Some(library);
        self.table = table;
        self.stage = LoaderStage::Loaded;
        Ok(&self.table)
    }

    /// Resolve the instance-scope tiers plus the platform tier for `instance`.
    ///
    /// On failure the instance-scope entries are discarded; the caller still
    /// owns the instance and must destroy it before releasing the loader.
    pub fn resolve_instance_symbols(
        &mut self,
        instance: vk::Instance,
        platform: &[SymbolDecl],
    ) -> Result<(), LoadError> {
        if self.library.is_none() {
            return Err(LoadError::NotLoaded);
        }
        if instance == vk::Instance::null() {
            return Err(LoadError::InstanceRequired);
        }

        let gipa = self.get_instance_proc_addr()?;
        self.table.drop_scope(SymbolScope::Instance);

        let mut tiers: Vec<&[SymbolDecl]> = INSTANCE_TIERS.to_vec();
        tiers.push(platform);

        let lookup = |name: &CStr| unsafe { gipa(instance, name.as_ptr()) };
        for decls in tiers {
            match resolve_tier(decls, lookup) {
                Ok((resolved, missing)) => self.table.merge(resolved, missing),
                Err(e) => {
                    self.table.drop_scope(SymbolScope::Instance);
                    self.stage = LoaderStage::Loaded;
                    return Err(e);
                }
            }
        }

        log::debug!(
            "Resolved instance entry points: {} core, {} surface, {} platform",
            self.table.tier_len(SymbolTier::Instance),
            self.table.tier_len(SymbolTier::SurfaceInstance),
            self.table.tier_len(SymbolTier::PlatformInstance)
        );

        self.stage = LoaderStage::InstanceResolved;
        Ok(())
    }

    /// Build the ash entry from the resolved `vkGetInstanceProcAddr`.
    pub fn entry(&self) -> Result<ash::Entry, LoadError> {
        let get_instance_proc_addr = self.get_instance_proc_addr()?;
        let static_fn = vk::StaticFn { get_instance_proc_addr };
        Ok(unsafe { ash::Entry::from_static_fn(static_fn) })
    }

    /// Unload the library and forget every resolved symbol. No-op when
    /// nothing is loaded.
    pub fn release(&mut self) {
        if self.library.take().is_some() {
            log::info!("Releasing driver library {}", self.library_name);
        }
        self.table.clear();
        self.stage = LoaderStage::Unloaded;
    }

    pub fn is_loaded(&self) -> bool {
        self.library.is_some()
    }

    pub fn instance_symbols_resolved(&self) -> bool {
        self.stage == LoaderStage::InstanceResolved
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    fn get_instance_proc_addr(&self) -> Result<vk::PFN_vkGetInstanceProcAddr, LoadError> {
        unsafe { self.table.typed::<vk::PFN_vkGetInstanceProcAddr>(GET_INSTANCE_PROC_ADDR) }
            .ok_or(LoadError::NotLoaded)
    }
}

impl Drop for SymbolLoader {
    fn drop(&mut self) {
        self.release();
    }
}
