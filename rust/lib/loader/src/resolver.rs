//! Dependency resolver: requested modules → total load order.
//!
//! 1. Select the transitive `depends` closure of the request.
//! 2. Add auto-install modules whose trigger set is selected, to fixpoint.
//! 3. Reject missing, non-installable and conflicting modules.
//! 4. Reject cycles, listing every strongly connected component.
//! 5. Order topologically, ties broken by module name.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use openerp_core::{Abort, DiagnosticSink};
use openerp_ir::{Diagnostic, DiagnosticKind, Manifest};
use tracing::{debug, info};

/// Compute the load order for `requested` over the discovered `manifests`.
pub fn resolve(
    manifests: &IndexMap<String, Manifest>,
    requested: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<Vec<String>, Abort> {
    let mut selected = BTreeSet::new();

    for name in requested {
        match manifests.get(name) {
            None => sink.push(Diagnostic::new(
                DiagnosticKind::MissingDependency,
                format!("requested module '{}' was not found in any addon root", name),
            ))?,
            Some(m) if !m.installable => sink.push(
                Diagnostic::new(
                    DiagnosticKind::ModuleNotInstallable,
                    format!("module '{}' is marked installable = false", name),
                )
                .in_module(name),
            )?,
            Some(_) => close_over(manifests, name, &mut selected, sink)?,
        }
    }

    auto_install(manifests, &mut selected, sink)?;
    check_conflicts(manifests, &selected, sink)?;
    sink.end_phase("resolve")?;

    let graph = load_graph(manifests, &selected);
    let cycles = strongly_connected(&graph)
        .into_iter()
        .filter(|c| c.len() > 1 || graph[c[0]].contains(c[0]))
        .collect::<Vec<_>>();
    if !cycles.is_empty() {
        let listed: Vec<String> = cycles
            .iter()
            .map(|c| format!("{{{}}}", c.join(", ")))
            .collect();
        sink.push(Diagnostic::new(
            DiagnosticKind::CycleDetected,
            format!("dependency cycle among {}", listed.join(", ")),
        ))?;
    }

    let order = topological(&graph);
    info!("resolved load order: {}", order.join(", "));
    Ok(order)
}

/// Add `name` and everything it transitively depends on.
fn close_over(
    manifests: &IndexMap<String, Manifest>,
    name: &str,
    selected: &mut BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), Abort> {
    let mut stack = vec![name.to_string()];
    while let Some(current) = stack.pop() {
        if !selected.insert(current.clone()) {
            continue;
        }
        let Some(manifest) = manifests.get(&current) else {
            continue;
        };
        for dep in manifest.load_after() {
            match manifests.get(dep) {
                None => sink.push(
                    Diagnostic::new(
                        DiagnosticKind::MissingDependency,
                        format!("module '{}' depends on '{}', which was not found", current, dep),
                    )
                    .in_module(&current),
                )?,
                Some(d) if !d.installable => sink.push(
                    Diagnostic::new(
                        DiagnosticKind::ModuleNotInstallable,
                        format!("'{}' (required by '{}') is not installable", dep, current),
                    )
                    .in_module(&current),
                )?,
                Some(_) if !selected.contains(dep) => stack.push(dep.to_string()),
                Some(_) => {}
            }
        }
    }
    Ok(())
}

/// Auto-install closure: repeat until no module's trigger becomes satisfied.
fn auto_install(
    manifests: &IndexMap<String, Manifest>,
    selected: &mut BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), Abort> {
    loop {
        let ready: Vec<String> = manifests
            .values()
            .filter(|m| m.installable && !selected.contains(&m.module))
            .filter(|m| {
                m.auto_install_trigger()
                    .is_some_and(|trigger| trigger.iter().all(|t| selected.contains(*t)))
            })
            .map(|m| m.module.clone())
            .collect();
        if ready.is_empty() {
            return Ok(());
        }
        for name in ready {
            debug!("auto-install: {}", name);
            close_over(manifests, &name, selected, sink)?;
        }
    }
}

fn check_conflicts(
    manifests: &IndexMap<String, Manifest>,
    selected: &BTreeSet<String>,
    sink: &mut DiagnosticSink,
) -> Result<(), Abort> {
    let mut reported = BTreeSet::new();
    for name in selected {
        let Some(manifest) = manifests.get(name) else {
            continue;
        };
        for other in manifest.excludes.intersection(selected) {
            let pair = if name < other {
                (name.as_str(), other.as_str())
            } else {
                (other.as_str(), name.as_str())
            };
            if reported.insert(pair) {
                sink.push(
                    Diagnostic::new(
                        DiagnosticKind::ModuleConflict,
                        format!("modules '{}' and '{}' exclude each other", pair.0, pair.1),
                    )
                    .in_module(name),
                )?;
            }
        }
    }
    Ok(())
}

/// Edges `module → modules it must load after`, restricted to the selection.
fn load_graph<'a>(
    manifests: &'a IndexMap<String, Manifest>,
    selected: &'a BTreeSet<String>,
) -> BTreeMap<&'a str, BTreeSet<&'a str>> {
    selected
        .iter()
        .filter_map(|name| manifests.get(name))
        .map(|m| {
            let deps = m
                .load_after()
                .into_iter()
                .filter(|d| selected.contains(*d))
                .collect();
            (m.module.as_str(), deps)
        })
        .collect()
}

/// Tarjan's algorithm. Each component is sorted; components are sorted by
/// their first member.
fn strongly_connected<'a>(graph: &BTreeMap<&'a str, BTreeSet<&'a str>>) -> Vec<Vec<&'a str>> {
    struct State<'a> {
        index: usize,
        indices: BTreeMap<&'a str, usize>,
        lowlink: BTreeMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: BTreeSet<&'a str>,
        components: Vec<Vec<&'a str>>,
    }

    fn visit<'a>(v: &'a str, graph: &BTreeMap<&'a str, BTreeSet<&'a str>>, s: &mut State<'a>) {
        s.indices.insert(v, s.index);
        s.lowlink.insert(v, s.index);
        s.index += 1;
        s.stack.push(v);
        s.on_stack.insert(v);

        for &w in graph.get(v).into_iter().flatten() {
            if !s.indices.contains_key(w) {
                visit(w, graph, s);
                let low = s.lowlink[v].min(s.lowlink[w]);
                s.lowlink.insert(v, low);
            } else if s.on_stack.contains(w) {
                let low = s.lowlink[v].min(s.indices[w]);
                s.lowlink.insert(v, low);
            }
        }

        if s.lowlink[v] == s.indices[v] {
            let mut component = Vec::new();
            while let Some(w) = s.stack.pop() {
                s.on_stack.remove(w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            component.sort_unstable();
            s.components.push(component);
        }
    }

    let mut state = State {
        index: 0,
        indices: BTreeMap::new(),
        lowlink: BTreeMap::new(),
        stack: Vec::new(),
        on_stack: BTreeSet::new(),
        components: Vec::new(),
    };
    for &v in graph.keys() {
        if !state.indices.contains_key(v) {
            visit(v, graph, &mut state);
        }
    }
    let mut components = state.components;
    components.sort();
    components
}

/// Kahn's algorithm over an acyclic graph; the smallest ready name goes first.
fn topological(graph: &BTreeMap<&str, BTreeSet<&str>>) -> Vec<String> {
    let mut pending: BTreeMap<&str, usize> =
        graph.iter().map(|(name, deps)| (*name, deps.len())).collect();
    let mut dependants: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, deps) in graph {
        for dep in deps {
            dependants.entry(*dep).or_default().push(*name);
        }
    }

    let mut ready: BTreeSet<&str> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut order = Vec::with_capacity(graph.len());

    while let Some(next) = ready.pop_first() {
        order.push(next.to_string());
        for dependant in dependants.get(next).into_iter().flatten() {
            if let Some(n) = pending.get_mut(dependant) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(*dependant);
                }
            }
        }
    }
    order
}
