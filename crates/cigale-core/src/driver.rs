//! Orchestration of a `savefluxes` simulation run.
//!
//! A run walks the stages of [`PipelineStage`] strictly in order inside one
//! working directory. The working directory holds the shared `pcigale.ini`
//! and the `out/` directory of the external program, so it must be owned by
//! a single in-flight simulation; concurrent runs need separate directories.

use crate::config::patch_file;
use crate::domain::{BandSelection, CigaleError, CigaleResult, ModuleConfig, ParamMap, ParamValue};
use crate::filters::band_name_list;
use crate::process::{PcigaleStep, ProcessRunner, SystemProcessRunner};
use crate::serialization::ensure_parent_dir;
use crate::table::ModelTable;
use globset::Glob;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "pcigale.ini";
pub const DEFAULT_BLOCK_FILE: &str = "out/models-block-0.fits";
pub const DEFAULT_CLEANUP_GLOB: &str = "*_out";
pub const ANALYSIS_METHOD: &str = "savefluxes";
pub const FITS_SUFFIX: &str = "fits";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Init,
    PatchTopLevel,
    GenerateConfig,
    PatchModules,
    PatchOutput,
    Run,
    Cleanup,
    Load,
}

impl PipelineStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::PatchTopLevel => "PATCH_TOP_LEVEL",
            Self::GenerateConfig => "GENERATE_CONFIG",
            Self::PatchModules => "PATCH_MODULES",
            Self::PatchOutput => "PATCH_OUTPUT",
            Self::Run => "RUN",
            Self::Cleanup => "CLEANUP",
            Self::Load => "LOAD",
        }
    }
}

impl Display for PipelineStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

/// File layout of the external program inside the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSettings {
    pub config_file: PathBuf,
    pub block_file: PathBuf,
    pub cleanup_glob: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            block_file: PathBuf::from(DEFAULT_BLOCK_FILE),
            cleanup_glob: DEFAULT_CLEANUP_GLOB.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationRequest {
    pub modules: ModuleConfig,
    pub bands: BandSelection,
    pub cores: u32,
    pub save_sed: bool,
    pub delete_old_outputs: bool,
}

impl SimulationRequest {
    pub fn new(modules: ModuleConfig, bands: BandSelection) -> Self {
        Self {
            modules,
            bands,
            cores: 1,
            save_sed: false,
            delete_old_outputs: true,
        }
    }

    pub fn with_cores(mut self, cores: u32) -> Self {
        self.cores = cores;
        self
    }

    pub fn with_save_sed(mut self, save_sed: bool) -> Self {
        self.save_sed = save_sed;
        self
    }

    pub fn with_delete_old_outputs(mut self, delete_old_outputs: bool) -> Self {
        self.delete_old_outputs = delete_old_outputs;
        self
    }
}

/// Where a fetched table is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub output_dir: PathBuf,
    pub file_name: Option<String>,
    pub save_output: bool,
}

impl OutputTarget {
    pub fn new(output_dir: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            file_name: Some(file_name.into()),
            save_output: true,
        }
    }

    /// Keeps the table in memory only.
    pub fn discard() -> Self {
        Self {
            output_dir: PathBuf::new(),
            file_name: None,
            save_output: false,
        }
    }

    pub fn cache_key(&self) -> Option<CacheKey> {
        self.file_name
            .as_deref()
            .map(|file_name| CacheKey::new(&self.output_dir, file_name))
    }
}

/// Cache lookup for [`SimulationDriver::quick_access`].
///
/// The key is the destination path alone. A cached file is reused whatever
/// simulation parameters produced it, so changing the modules or bands of a
/// request requires a new file name or a forced re-simulation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
}

impl CacheKey {
    pub fn new(output_dir: &Path, file_name: &str) -> Self {
        Self {
            path: verify_suffix(&output_dir.join(file_name), FITS_SUFFIX),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_cached(&self) -> bool {
        self.path.is_file()
    }
}

/// Appends `.{suffix}` unless the path already carries that extension.
pub fn verify_suffix(path: &Path, suffix: &str) -> PathBuf {
    if path.extension().and_then(|extension| extension.to_str()) == Some(suffix) {
        return path.to_path_buf();
    }
    let mut raw = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Column order of a loaded table: band fluxes first, then physical parameters.
pub fn requested_columns<S: AsRef<str>>(params: &[S], bands: &BandSelection) -> Vec<String> {
    let mut columns = band_name_list(bands);
    columns.extend(params.iter().map(|param| param.as_ref().to_string()));
    columns
}

pub struct SimulationDriver<R = SystemProcessRunner> {
    runner: R,
    working_dir: PathBuf,
    settings: DriverSettings,
}

impl<R> SimulationDriver<R>
where
    R: ProcessRunner,
{
    pub fn new(runner: R, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            working_dir: working_dir.into(),
            settings: DriverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DriverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn config_path(&self) -> PathBuf {
        self.working_dir.join(&self.settings.config_file)
    }

    pub fn block_path(&self) -> PathBuf {
        self.working_dir.join(&self.settings.block_file)
    }

    /// init → patch top level → genconf → patch modules → patch output → run
    /// → optional cleanup. A non-zero exit of any external step aborts the run.
    pub fn run_simulation(&self, request: &SimulationRequest) -> CigaleResult<()> {
        let config_path = self.config_path();

        self.enter(PipelineStage::Init);
        self.invoke(PcigaleStep::Init)?;

        self.enter(PipelineStage::PatchTopLevel);
        let top_level = ParamMap::new()
            .with("sed_modules", request.modules.module_names())
            .with("analysis_method", ANALYSIS_METHOD)
            .with("cores", request.cores);
        patch_file(&config_path, &top_level)?;

        self.enter(PipelineStage::GenerateConfig);
        self.invoke(PcigaleStep::Genconf)?;

        self.enter(PipelineStage::PatchModules);
        for (module, params) in request.modules.iter() {
            debug!(module, parameters = params.len(), "patching module parameters");
            patch_file(&config_path, params)?;
        }

        self.enter(PipelineStage::PatchOutput);
        let bands = band_name_list(&request.bands);
        info!(bands = bands.len(), save_sed = request.save_sed, "selected output bands");
        let output = ParamMap::new()
            .with("bands", ParamValue::from(bands))
            .with("save_sed", request.save_sed);
        patch_file(&config_path, &output)?;

        self.enter(PipelineStage::Run);
        self.invoke(PcigaleStep::Run)?;

        if request.delete_old_outputs {
            self.enter(PipelineStage::Cleanup);
            self.remove_old_outputs()?;
        }
        Ok(())
    }

    /// Reads a block file and keeps the band columns followed by `params`.
    ///
    /// `block_file` defaults to the configured block file; relative paths are
    /// resolved against the working directory.
    pub fn load_model_params<S: AsRef<str>>(
        &self,
        params: &[S],
        bands: &BandSelection,
        block_file: Option<&Path>,
    ) -> CigaleResult<ModelTable> {
        self.enter(PipelineStage::Load);
        let path = match block_file {
            Some(path) => self.working_dir.join(path),
            None => self.block_path(),
        };
        ModelTable::read_fits_columns(&path, &requested_columns(params, bands))
    }

    pub fn simulate_and_fetch<S: AsRef<str>>(
        &self,
        request: &SimulationRequest,
        params: &[S],
        output: &OutputTarget,
    ) -> CigaleResult<ModelTable> {
        self.run_simulation(request)?;
        let table = self.load_model_params(params, &request.bands, None)?;

        if output.save_output {
            if let Some(key) = output.cache_key() {
                ensure_parent_dir(key.path())?;
                table.write_fits(key.path(), true)?;
                info!(path = %key.path().display(), rows = table.num_rows(), "saved model table");
            }
        }

        Ok(table)
    }

    /// Loads the cached table when its file exists, otherwise simulates.
    ///
    /// Only the existence of the destination file is checked; see [`CacheKey`].
    pub fn quick_access<S: AsRef<str>>(
        &self,
        request: &SimulationRequest,
        params: &[S],
        output: &OutputTarget,
        force_resimulate: bool,
    ) -> CigaleResult<ModelTable> {
        let key = output.cache_key().ok_or_else(|| {
            CigaleError::InvalidArgument("quick access needs an output file name".to_string())
        })?;

        if key.is_cached() && !force_resimulate {
            info!(path = %key.path().display(), "reusing cached model table");
            return ModelTable::read_fits_columns(
                key.path(),
                &requested_columns(params, &request.bands),
            );
        }

        self.simulate_and_fetch(request, params, output)
    }

    /// Deletes every directory of the working directory matching the cleanup glob.
    pub fn remove_old_outputs(&self) -> CigaleResult<Vec<PathBuf>> {
        let matcher = Glob::new(&self.settings.cleanup_glob)
            .map_err(|source| {
                CigaleError::InvalidArgument(format!(
                    "invalid cleanup pattern '{}': {}",
                    self.settings.cleanup_glob, source
                ))
            })?
            .compile_matcher();

        let entries = fs::read_dir(&self.working_dir)
            .map_err(|source| CigaleError::io(&self.working_dir, source))?;

        let mut removed = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CigaleError::io(&self.working_dir, source))?;
            let path = entry.path();
            if !path.is_dir() || !matcher.is_match(entry.file_name()) {
                continue;
            }
            fs::remove_dir_all(&path).map_err(|source| CigaleError::io(&path, source))?;
            warn!(path = %path.display(), "removed old output directory");
            removed.push(path);
        }

        removed.sort();
        Ok(removed)
    }

    fn enter(&self, stage: PipelineStage) {
        info!(%stage, working_dir = %self.working_dir.display(), "simulation stage");
    }

    fn invoke(&self, step: PcigaleStep) -> CigaleResult<()> {
        let outcome = self.runner.run(step, &self.working_dir)?;
        if outcome.is_success() {
            return Ok(());
        }
        Err(CigaleError::ProcessFailed {
            program: self.runner.program().to_string(),
            step: step.as_str(),
            status: outcome.describe(),
        })
    }
}
