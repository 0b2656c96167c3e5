use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::project::Project;

/// Reject task graphs that could never finish: duplicate titles, pending
/// tasks depending on undefined titles, and dependency cycles among pending
/// tasks. Done tasks count as satisfied dependencies.
pub fn check_graph(project: &Project) -> Result<()> {
    project.validate()?;

    let done: HashSet<&str> = project
        .tasks
        .iter()
        .filter(|t| t.done)
        .map(|t| t.title.as_str())
        .collect();

    let mut pending: Vec<&str> = Vec::new();
    let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();

    for task in project.tasks.iter().filter(|t| !t.done) {
        let mut deps = Vec::new();
        for dependency in &task.depends_on {
            if done.contains(dependency.as_str()) {
                continue;
            }
            if project.task(dependency).is_none() {
                return Err(Error::UndefinedDependency {
                    task: task.title.clone(),
                    dependency: dependency.clone(),
                });
            }
            deps.push(dependency.as_str());
        }
        pending.push(task.title.as_str());
        edges.insert(task.title.as_str(), deps);
    }

    match detect_cycle(&pending, &edges) {
        Some(cycle) => Err(Error::DependencyCycle(cycle)),
        None => Ok(()),
    }
}

/// Depth-first search in declared order; returns the cycle path closed on
/// its first node.
fn detect_cycle<'a>(nodes: &[&'a str], edges: &HashMap<&'a str, Vec<&'a str>>) -> Option<Vec<String>> {
    let mut visited = HashSet::new();
    let mut stack = Vec::new();

    for &node in nodes {
        if let Some(cycle) = visit(node, edges, &mut visited, &mut stack) {
            return Some(cycle);
        }
    }

    None
}

fn visit<'a>(
    node: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    if let Some(pos) = stack.iter().position(|n| *n == node) {
        let mut cycle: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
        cycle.push(node.to_string());
        return Some(cycle);
    }

    if !visited.insert(node) {
        return None;
    }

    stack.push(node);
    for &dep in edges.get(node).map(Vec::as_slice).unwrap_or_default() {
        if let Some(cycle) = visit(dep, edges, visited, stack) {
            return Some(cycle);
        }
    }
    stack.pop();

    None
}
