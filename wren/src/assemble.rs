use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use folio::{err, error, rayon, Renderer};
use folio::error::{Chainable, Result};
use folio::rayon::prelude::*;
use folio::route::Route;
use folio::templating::minijinja::MiniJinjaEngine;
use folio::templating::{EngineInit, Layouts, LoadProblem};
use folio::util::PathExt;

use crate::config::Settings;
use crate::discover::{self, Discovery};
use crate::issue::{normalize, Issue};
use crate::render::{self, Contents, Output, WrenRenderer};
use crate::{assets, route};

/// The stages of a build, in order. A build ends in `Done` or `Failed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    Init,
    Discover,
    Parse,
    Index,
    Route,
    Render,
    Write,
    Done,
    Failed,
}

/// The outcome of a build that ran to `Done` or stopped at a fatal issue.
#[derive(Debug)]
pub struct Report {
    pub stage: Stage,
    /// Every route written, sorted.
    pub routes: Vec<Route>,
    /// Every issue, most severe first, without duplicates.
    pub issues: Vec<Issue>,
}

impl Report {
    pub fn succeeded(&self) -> bool {
        self.stage == Stage::Done
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.succeeded() {
            true => writeln!(f, "built {} routes with {} issues", self.routes.len(), self.issues.len())?,
            false => writeln!(f, "build failed with {} issues: nothing was written", self.issues.len())?,
        }

        for route in &self.routes {
            writeln!(f, "  {route}")?;
        }

        for issue in &self.issues {
            writeln!(f, "{}: {issue}", issue.severity())?;
        }

        Ok(())
    }
}

/// Builds the site at `input` into `output`, one stage at a time.
///
/// Configuration and I/O errors are returned as errors. Fatal issues end the
/// build in a failed [`Report`]. Nothing is written unless every stage
/// before `Write` succeeds.
#[derive(Debug)]
pub struct Assembler {
    input: PathBuf,
    output: PathBuf,
    stage: Stage,
    issues: Mutex<Vec<Issue>>,
}

impl Assembler {
    pub fn new<I: AsRef<Path>, O: AsRef<Path>>(input: I, output: O) -> Self {
        Assembler {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            stage: Stage::Init,
            issues: Mutex::new(vec![]),
        }
    }

    fn advance(&mut self, next: Stage) {
        tracing::debug!(from = ?self.stage, to = ?next, "build stage");
        self.stage = next;
    }

    /// Moves to `Failed` if `result` is an error.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.advance(Stage::Failed);
        }

        result
    }

    fn fail(mut self, fatal: Vec<Issue>) -> Report {
        self.issues.get_mut().extend(fatal);
        self.advance(Stage::Failed);
        self.report(vec![])
    }

    fn report(self, mut routes: Vec<Route>) -> Report {
        let mut issues = self.issues.into_inner();
        normalize(&mut issues);
        routes.sort();
        Report { stage: self.stage, routes, issues }
    }

    pub fn run(mut self) -> Result<Report> {
        let root = self.input.canonicalize().chain_with(|| error! {
            "site root must be an existing directory",
            "path" => self.input.display(),
        });

        let root = self.check(root)?;
        let (settings, config) = Settings::load(&root).chain_with(|| error!("failed to load configuration"))?;
        let output = absolute(&self.output)?;
        if output == root {
            return err!("output directory must differ from the site root", "path" => output.display());
        }

        let nested_output = output.strip_prefix(&root).ok().map(Path::to_path_buf);
        let mut collections = settings.collections();
        collections.push(settings.pages());

        self.advance(Stage::Discover);
        let tree = discover::walk(&root, &settings, config.into_iter().chain(nested_output))?;
        let Discovery { sources, statics } = discover::classify(&tree, &settings, &collections);

        self.advance(Stage::Parse);
        let parsed = sources.par_iter()
            .map(|source| discover::parse(source, &collections[source.collection], &self.issues))
            .collect::<Result<Vec<_>>>();

        let parsed = self.check(parsed)?;

        self.advance(Stage::Index);
        let (layouts, problems) = Layouts::load(&tree, &settings.layouts_dir)?;
        self.issues.get_mut().extend(problems.into_iter().map(|(path, problem)| match problem {
            LoadProblem::NotUtf8 => Issue::InvalidUtf8 { path: path.to_url_path() },
            LoadProblem::FrontMatter(e) => Issue::MalformedFrontMatter {
                path: path.to_url_path(),
                message: e.to_string(),
            },
        }));

        let data = discover::load_data(&tree, &settings.data_dir, &self.issues);
        let site = discover::index(Arc::from(root.as_path()), collections, &sources, parsed, statics);
        tracing::debug!("indexed {} entries:\n{}", site.item_count(), site.visualize());

        self.advance(Stage::Route);
        let claims = route::Claims::default();
        route::assign(&site, &claims, &self.issues);
        if assets::has_stylesheet(&root, &settings) {
            let entry: Arc<Path> = settings.stylesheet.entry.as_path().into();
            claims.claim(settings.stylesheet.output_path(), assets::route(&settings), entry);
        }

        let collisions = claims.collisions();
        if !collisions.is_empty() {
            return Ok(self.fail(collisions));
        }

        self.advance(Stage::Render);
        let (skin, problem) = assets::skin(&root, &settings);
        self.issues.get_mut().extend(problem);

        let globals = render::globals(&settings, &site, data, &skin);
        let includes = root.join(&settings.includes_dir);
        let engine = MiniJinjaEngine::init(Arc::new(globals), includes.is_dir().then_some(&*includes));
        let renderer = WrenRenderer { engine: &engine, layouts: &layouts, issues: &self.issues };
        let (stylesheet, rendered) = rayon::join(
            || assets::build(&root, &settings, &skin),
            || renderer.render_site(&site),
        );

        let mut outputs = match rendered {
            Ok(outputs) => outputs,
            Err(fatal) => return Ok(self.fail(fatal)),
        };

        match stylesheet {
            Some(Ok(css)) => outputs.push(css),
            Some(Err(issue)) => self.issues.get_mut().push(issue),
            None => tracing::debug!("no stylesheet: skipping assets"),
        }

        self.advance(Stage::Write);
        let written = write(&output, &outputs);
        self.check(written)?;

        self.advance(Stage::Done);
        let routes = outputs.into_iter().map(|output| output.route).collect();
        Ok(self.report(routes))
    }
}

/// `path` made absolute, with its longest existing prefix canonicalized.
fn absolute(path: &Path) -> Result<PathBuf> {
    let path = match path.is_absolute() {
        true => path.to_path_buf(),
        false => std::env::current_dir()?.join(path),
    };

    let mut existing = path.as_path();
    let mut rest = vec![];
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut absolute = existing.canonicalize().unwrap_or_else(|_| existing.to_path_buf());
    absolute.extend(rest.into_iter().rev());
    Ok(absolute)
}

fn write(output: &Path, outputs: &[Output]) -> Result<()> {
    fs::create_dir_all(output)
        .chain_with(|| error!("failed to create output directory", "path" => output.display()))?;

    outputs.par_iter().try_for_each(|file| {
        let path = output.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .chain_with(|| error!("failed to create directory", "path" => parent.display()))?;
        }

        let result = match &file.contents {
            Contents::Text(text) => fs::write(&path, text),
            Contents::Copy(source) => fs::copy(source, &path).map(|_| ()),
        };

        result.chain_with(|| error!("failed to write output", "path" => path.display()))
    })?;

    tracing::debug!(files = outputs.len(), output = %output.display(), "wrote site");
    Ok(())
}
