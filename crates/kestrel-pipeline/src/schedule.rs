//! Dependency scheduling over declared stages.

use std::collections::HashSet;

use crate::error::PipelineError;
use crate::stage::Stage;

/// Reject duplicate names, unknown dependencies and cycles before anything
/// runs.
pub fn validate_stages(stages: &[Stage]) -> Result<(), PipelineError> {
    let mut names = HashSet::new();
    for stage in stages {
        if !names.insert(stage.name.as_str()) {
            return Err(PipelineError::DuplicateStage(stage.name.clone()));
        }
    }
    for stage in stages {
        if let Some(dependency) = stage
            .dependencies
            .iter()
            .find(|d| !names.contains(d.as_str()))
        {
            return Err(PipelineError::UnknownDependency {
                stage: stage.name.clone(),
                dependency: dependency.clone(),
            });
        }
    }

    let mut done: HashSet<&str> = HashSet::new();
    let mut pending: Vec<&Stage> = stages.iter().collect();
    while !pending.is_empty() {
        let ready = ready_set(&pending, &done);
        if ready.is_empty() {
            return Err(PipelineError::CircularDependency {
                stages: pending.iter().map(|s| s.name.clone()).collect(),
            });
        }
        done.extend(ready.iter().map(|s| s.name.as_str()));
        pending.retain(|s| !done.contains(s.name.as_str()));
    }
    Ok(())
}

/// Pending stages whose dependencies are all done, in declaration order.
pub fn ready_set<'a>(pending: &[&'a Stage], done: &HashSet<&str>) -> Vec<&'a Stage> {
    pending
        .iter()
        .copied()
        .filter(|stage| stage.dependencies.iter().all(|d| done.contains(d.as_str())))
        .collect()
}

/// Split a ready set into execution groups.
///
/// A stage joins the current group only when both it and the stage right
/// before it are `parallel`. Non-adjacent parallel stages run in separate
/// groups.
pub fn group_parallel<'a>(ready: &[&'a Stage]) -> Vec<Vec<&'a Stage>> {
    let mut groups: Vec<Vec<&'a Stage>> = Vec::new();
    for &stage in ready {
        match groups.last_mut() {
            Some(group)
                if stage.parallel && group.last().is_some_and(|prev| prev.parallel) =>
            {
                group.push(stage);
            }
            _ => groups.push(vec![stage]),
        }
    }
    groups
}
