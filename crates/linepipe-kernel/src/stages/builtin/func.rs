//! filter and map — stages built from closures, for programmatic pipelines.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::stages::lines::map_lines;
use crate::stages::{Stage, StageContext, StageError, StageInput, StageOutput};

type Predicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;
type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

fn described(base: &str, desc: Option<&str>) -> String {
    match desc {
        Some(desc) if !desc.is_empty() => format!("{base}({desc})"),
        _ => base.to_string(),
    }
}

/// Keep lines for which the predicate returns true.
#[derive(Clone)]
pub struct Filter {
    name: String,
    predicate: Predicate,
}

impl Filter {
    pub fn new(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: described("filter", None),
            predicate: Arc::new(predicate),
        }
    }

    /// Attach a description, shown as `filter(desc)`.
    pub fn describe(mut self, desc: &str) -> Self {
        self.name = described("filter", Some(desc));
        self
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for Filter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        map_lines(ctx, input, output, |line| (self.predicate)(&line).then_some(line)).await
    }
}

/// Replace every line with the transform's result.
#[derive(Clone)]
pub struct Map {
    name: String,
    transform: Transform,
}

impl Map {
    pub fn new(transform: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            name: described("map", None),
            transform: Arc::new(transform),
        }
    }

    /// Attach a description, shown as `map(desc)`.
    pub fn describe(mut self, desc: &str) -> Self {
        self.name = described("map", Some(desc));
        self
    }
}

impl fmt::Debug for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for Map {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(
        &self,
        ctx: &StageContext,
        input: &mut StageInput<'_>,
        output: &mut StageOutput<'_>,
    ) -> Result<(), StageError> {
        map_lines(ctx, input, output, |line| Some((self.transform)(&line))).await
    }
}
