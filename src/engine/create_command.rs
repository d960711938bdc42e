// src/engine/create_command.rs

//! The argv a container or pod was originally created with
//!
//! Podman records the full command line of `podman run`/`podman create`/
//! `podman pod create`. It is the single source for the settings that have
//! to follow a container to the destination: network, env files, secrets,
//! and `--requires` dependencies. Values are read from both the
//! `--flag value` and `--flag=value` spellings.

use crate::remote::shell_quote;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Network modes that do not refer to a named network
const SPECIAL_NETWORKS: &[&str] = &["host", "none", "bridge", "private", "slirp4netns", "pasta"];
const SPECIAL_NETWORK_PREFIXES: &[&str] = &["container:", "ns:", "slirp4netns:", "pasta:"];

/// Original create command of a container or pod
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCommand {
    args: Vec<String>,
}

impl CreateCommand {
    pub fn new(args: Vec<String>) -> Self {
        Self { args }
    }

    /// Build from string slices (tests and fixtures)
    pub fn from_args(args: &[&str]) -> Self {
        Self::new(args.iter().map(|a| a.to_string()).collect())
    }

    /// Every value given for any of `names`, in command-line order.
    ///
    /// Only podman's own options are scanned: for `run`/`create` the scan
    /// stops at the image, since what follows belongs to the container's
    /// command.
    pub fn option_values(&self, names: &[&str]) -> Vec<&str> {
        let mut values = Vec::new();
        let mut iter = self.args[..self.options_end()].iter().skip(1);

        while let Some(arg) = iter.next() {
            if arg == "--" {
                break;
            }
            for name in names {
                if arg == name {
                    if let Some(value) = iter.next() {
                        values.push(value.as_str());
                    }
                    break;
                }
                if let Some(value) = arg.strip_prefix(name).and_then(|r| r.strip_prefix('=')) {
                    values.push(value);
                    break;
                }
            }
        }
        values
    }

    /// Last value given for any of `names`
    pub fn option_value(&self, names: &[&str]) -> Option<&str> {
        self.option_values(names).pop()
    }

    /// Named network, if the command attaches to one
    pub fn network(&self) -> Option<&str> {
        let value = self.option_value(&["--network", "--net"])?;
        // "appnet:ip=10.0.0.5" style options follow the name
        let name = value.split(':').next().unwrap_or(value);
        if SPECIAL_NETWORKS.contains(&value)
            || SPECIAL_NETWORK_PREFIXES.iter().any(|p| value.starts_with(p))
            || name.is_empty()
        {
            return None;
        }
        Some(name)
    }

    pub fn env_files(&self) -> Vec<PathBuf> {
        self.option_values(&["--env-file"])
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }

    /// Secret names from `--secret name[,opt=...]` or `--secret source=name,...`
    pub fn secrets(&self) -> Vec<String> {
        self.option_values(&["--secret"])
            .into_iter()
            .filter_map(|spec| {
                let first = spec.split(',').next()?;
                let name = first.strip_prefix("source=").unwrap_or(first);
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }

    /// Containers named by `--requires` (comma separated, may repeat)
    pub fn requires(&self) -> BTreeSet<String> {
        self.option_values(&["--requires"])
            .into_iter()
            .flat_map(|v| v.split(','))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn is_pod_command(&self) -> bool {
        self.args.get(1).is_some_and(|a| a == "pod")
    }

    /// End of podman's own options: the image index, or the whole argv for
    /// `pod create` and commands without an image
    fn options_end(&self) -> usize {
        if self.is_pod_command() {
            return self.args.len();
        }
        self.image_index().unwrap_or(self.args.len())
    }

    /// Index of the image argument of a `run`/`create` command, found by
    /// walking the options that precede it
    pub fn image_index(&self) -> Option<usize> {
        let mut i = 1;
        while i < self.args.len()
            && matches!(self.args[i].as_str(), "container" | "run" | "create")
        {
            i += 1;
        }

        while i < self.args.len() {
            let arg = self.args[i].as_str();
            if arg == "--" {
                return (i + 1 < self.args.len()).then_some(i + 1);
            }
            if !arg.starts_with('-') || arg == "-" {
                return Some(i);
            }
            if takes_value(arg) {
                i += 1;
            }
            i += 1;
        }
        None
    }

    /// Shell command that recreates the entity on the destination.
    ///
    /// `run` becomes `create` and detach flags are dropped so the entity is
    /// created stopped; starting it is a separate step. Arguments after the
    /// image belong to the container's own command and pass through.
    pub fn to_remote(&self) -> String {
        let options_end = self.image_index().unwrap_or(self.args.len());
        let mut out: Vec<String> = Vec::with_capacity(self.args.len());
        let mut in_subcommand = true;

        for (i, arg) in self.args.iter().enumerate() {
            if i == 0 {
                out.push("podman".to_string());
                continue;
            }
            if in_subcommand && !arg.starts_with('-') && i < options_end {
                out.push(if arg == "run" { "create".to_string() } else { shell_quote(arg) });
                continue;
            }
            in_subcommand = false;

            if i >= options_end {
                out.push(shell_quote(arg));
                continue;
            }
            // value of the previous option, never a flag of its own
            if i > 1 && takes_value(&self.args[i - 1]) {
                out.push(shell_quote(arg));
                continue;
            }

            match strip_detach(arg) {
                Some(kept) if kept.is_empty() => {}
                Some(kept) => out.push(shell_quote(&kept)),
                None => out.push(shell_quote(arg)),
            }
        }
        out.join(" ")
    }
}

/// Options of `podman run`/`create`/`pod create` that consume the next
/// argument when not written as `--flag=value`
const VALUE_FLAGS: &[&str] = &[
    "--add-host", "--annotation", "--arch", "--attach", "--authfile", "--blkio-weight",
    "--blkio-weight-device", "--cap-add", "--cap-drop", "--cgroup-conf", "--cgroup-parent",
    "--cgroupns", "--cgroups", "--chrootdirs", "--cidfile", "--conmon-pidfile", "--cpu-period",
    "--cpu-quota", "--cpu-rt-period", "--cpu-rt-runtime", "--cpu-shares", "--cpus",
    "--cpuset-cpus", "--cpuset-mems", "--decryption-key", "--detach-keys", "--device",
    "--device-cgroup-rule", "--device-read-bps", "--device-read-iops", "--device-write-bps",
    "--device-write-iops", "--dns", "--dns-option", "--dns-search", "--entrypoint", "--env",
    "--env-file", "--expose", "--gidmap", "--gpus", "--group-add", "--group-entry",
    "--health-cmd", "--health-interval", "--health-on-failure", "--health-retries",
    "--health-start-period", "--health-startup-cmd", "--health-timeout", "--hostname",
    "--hosts-file", "--hostuser", "--image-volume", "--infra-command", "--infra-conmon-pidfile",
    "--infra-image", "--infra-name", "--init-path", "--ip", "--ip6", "--ipc", "--label",
    "--label-file", "--log-driver", "--log-opt", "--mac-address", "--memory",
    "--memory-reservation", "--memory-swap", "--memory-swappiness", "--mount", "--name",
    "--net", "--network", "--network-alias", "--oom-score-adj", "--os", "--passwd-entry",
    "--personality", "--pid", "--pidfile", "--pids-limit", "--platform", "--pod",
    "--pod-id-file", "--preserve-fds", "--publish", "--pull", "--requires", "--restart",
    "--retry", "--retry-delay", "--runtime", "--sdnotify", "--seccomp-policy", "--secret",
    "--security-opt", "--share", "--shm-size", "--shm-size-systemd", "--stop-signal",
    "--stop-timeout", "--subgidname", "--subuidname", "--sysctl", "--timeout", "--tmpfs",
    "--tz", "--uidmap", "--ulimit", "--umask", "--unsetenv", "--user", "--userns", "--uts",
    "--variant", "--volume", "--volumes-from", "--workdir",
];

const SHORT_VALUE_FLAGS: &[char] = &['a', 'c', 'e', 'h', 'l', 'm', 'p', 'u', 'v', 'w'];

fn takes_value(arg: &str) -> bool {
    if arg.starts_with("--") {
        return !arg.contains('=') && VALUE_FLAGS.contains(&arg);
    }
    if !arg.starts_with('-') {
        return false;
    }
    // "-p" and "-dp" take the next argument, "-p8080:80" carries its value
    // inline, "-it" is boolean
    let cluster: Vec<char> = arg.chars().skip(1).collect();
    match cluster.iter().position(|c| SHORT_VALUE_FLAGS.contains(c)) {
        Some(pos) => pos + 1 == cluster.len(),
        None => false,
    }
}

/// Detach flag handling: `Some("")` drops the argument, `Some(rest)`
/// rewrites a short flag cluster, `None` keeps it as is
fn strip_detach(arg: &str) -> Option<String> {
    match arg {
        "-d" | "--detach" | "--detach=true" | "--detach=false" => Some(String::new()),
        _ if arg.starts_with('-')
            && !arg.starts_with("--")
            && arg.len() > 2
            && arg.chars().skip(1).all(|c| c.is_ascii_alphabetic())
            && arg.contains('d') =>
        {
            // a "d" after a value flag is part of that flag's inline value
            let mut rest = String::new();
            let mut in_value = false;
            for c in arg.chars().skip(1) {
                if in_value || c != 'd' {
                    rest.push(c);
                }
                in_value = in_value || SHORT_VALUE_FLAGS.contains(&c);
            }
            Some(format!("-{}", rest))
        }
        _ => None,
    }
}
