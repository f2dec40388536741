// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{ComposerError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ComposerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.settings, raw.services))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_services(cfg)?;
    validate_commands(cfg)?;
    validate_hook_references(cfg)?;
    validate_wait_order(cfg)?;
    validate_trim_patterns(cfg)?;
    Ok(())
}

fn ensure_has_services(cfg: &RawConfigFile) -> Result<()> {
    if cfg.services.is_empty() {
        return Err(ComposerError::Config(
            "config must declare at least one service under `services:`".to_string(),
        ));
    }
    Ok(())
}

fn validate_commands(cfg: &RawConfigFile) -> Result<()> {
    for (name, service) in cfg.services.iter() {
        if service.command.trim().is_empty() {
            return Err(ComposerError::Config(format!(
                "service '{name}' has an empty `command`"
            )));
        }
    }
    Ok(())
}

/// Every name referenced from a hook list must be a configured service.
///
/// The registry treats an unknown name as a fatal invariant violation, so
/// reject it here, at load time, instead of deep inside scheduling.
fn validate_hook_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, service) in cfg.services.iter() {
        let hooks = [("wait", &service.hooks.wait), ("kill", &service.hooks.kill)];
        for (kind, list) in hooks {
            for reference in list.iter() {
                if !cfg.services.contains_key(reference) {
                    return Err(ComposerError::Config(format!(
                        "service '{name}' references unknown service '{reference}' in `hooks.{kind}`"
                    )));
                }
                if reference == name {
                    return Err(ComposerError::Config(format!(
                        "service '{name}' cannot reference itself in `hooks.{kind}`"
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Wait hooks must not form a cycle, or the gated services would deadlock.
///
/// Edge direction: prerequisite -> dependent. For:
///
/// ```yaml
/// web:
///   hooks:
///     wait: [db]
/// ```
///
/// we add edge db -> web; a topological sort fails exactly when there is a
/// cycle.
fn validate_wait_order(cfg: &RawConfigFile) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.services.keys() {
        graph.add_node(name.as_str());
    }

    for (name, service) in cfg.services.iter() {
        for prerequisite in service.hooks.wait.iter() {
            graph.add_edge(prerequisite.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(ComposerError::Config(format!(
                "cycle detected in `hooks.wait` ordering involving service '{node}'"
            )))
        }
    }
}

/// A trim pattern must compile and must expose a named `message` capture,
/// since that capture is what gets forwarded to the log sink.
fn validate_trim_patterns(cfg: &RawConfigFile) -> Result<()> {
    for (name, service) in cfg.services.iter() {
        let Some(pattern) = service.log_trim_pattern.as_deref() else {
            continue;
        };

        let regex = Regex::new(pattern).map_err(|err| {
            ComposerError::Config(format!(
                "service '{name}' has an invalid `log_trim_pattern`: {err}"
            ))
        })?;

        if !regex.capture_names().flatten().any(|n| n == "message") {
            return Err(ComposerError::Config(format!(
                "service '{name}' `log_trim_pattern` must contain a named `message` capture"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::ServiceConfig;
    use std::collections::BTreeMap;

    fn raw(services: Vec<(&str, ServiceConfig)>) -> RawConfigFile {
        RawConfigFile {
            settings: Default::default(),
            services: services
                .into_iter()
                .map(|(name, service)| (name.to_string(), service))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn service(command: &str) -> ServiceConfig {
        ServiceConfig {
            command: command.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_services_are_rejected() {
        let err = ConfigFile::try_from(RawConfigFile::default()).unwrap_err();
        assert!(err.to_string().contains("at least one service"));
    }

    #[test]
    fn empty_command_is_rejected() {
        let err = ConfigFile::try_from(raw(vec![("a", service("  "))])).unwrap_err();
        assert!(err.to_string().contains("empty `command`"));
    }

    #[test]
    fn unknown_wait_reference_is_rejected() {
        let mut b = service("true");
        b.hooks.wait.push("ghost".to_string());
        let err = ConfigFile::try_from(raw(vec![("a", service("true")), ("b", b)])).unwrap_err();
        assert!(err.to_string().contains("unknown service 'ghost'"));
    }

    #[test]
    fn unknown_kill_reference_is_rejected() {
        let mut a = service("true");
        a.hooks.kill.push("ghost".to_string());
        let err = ConfigFile::try_from(raw(vec![("a", a)])).unwrap_err();
        assert!(err.to_string().contains("hooks.kill"));
    }

    #[test]
    fn self_reference_is_rejected() {
        let mut a = service("true");
        a.hooks.wait.push("a".to_string());
        let err = ConfigFile::try_from(raw(vec![("a", a)])).unwrap_err();
        assert!(err.to_string().contains("cannot reference itself"));
    }

    #[test]
    fn wait_cycle_is_rejected() {
        let mut a = service("true");
        a.hooks.wait.push("b".to_string());
        let mut b = service("true");
        b.hooks.wait.push("a".to_string());
        let err = ConfigFile::try_from(raw(vec![("a", a), ("b", b)])).unwrap_err();
        assert!(err.to_string().contains("cycle detected"));
    }

    #[test]
    fn trim_pattern_without_message_group_is_rejected() {
        let mut a = service("true");
        a.log_trim_pattern = Some(r"^(?P<level>\w+).*$".to_string());
        let err = ConfigFile::try_from(raw(vec![("a", a)])).unwrap_err();
        assert!(err.to_string().contains("`message` capture"));
    }

    #[test]
    fn valid_config_passes() {
        let mut web = service("rails s");
        web.hooks.wait.push("db".to_string());
        web.hooks.kill.push("db".to_string());
        web.log_trim_pattern = Some(r"^\S+ (?P<message>.*)$".to_string());
        let cfg = ConfigFile::try_from(raw(vec![("db", service("postgres")), ("web", web)]))
            .unwrap();
        assert_eq!(cfg.services().len(), 2);
    }
}
