// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Destination and run options shared by `migrate container` and `migrate pod`
fn remote_args() -> Vec<Arg> {
    vec![
        Arg::new("dst")
            .long("dst")
            .required(true)
            .value_name("HOST")
            .help("Destination host (name or address)"),
        Arg::new("port")
            .long("port")
            .default_value("22")
            .value_name("PORT")
            .help("SSH port on the destination"),
        Arg::new("keyfile")
            .long("keyfile")
            .value_name("FILE")
            .help("SSH key file, resolved against ssh.key_dir"),
        Arg::new("user")
            .long("user")
            .value_name("USER")
            .help("Remote user (overrides ssh.user)"),
        Arg::new("config")
            .long("config")
            .value_name("PATH")
            .help("Config file"),
        Arg::new("migrate_dir")
            .long("migrate-dir")
            .value_name("DIR")
            .help("Migration directory (overrides migrate_dir)"),
        Arg::new("batch")
            .long("batch")
            .action(ArgAction::SetTrue)
            .help("Never prompt; answer decisions from the [batch] config section"),
    ]
}

fn build_cli() -> Command {
    Command::new("podshift")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Podshift Contributors")
        .about("Migrate podman containers and pods to another host over SSH")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .subcommand(
            Command::new("migrate")
                .about("Migrate a container or pod")
                .subcommand(
                    Command::new("container")
                        .about("Migrate a container that is not part of a pod")
                        .arg(Arg::new("name").required(true).help("Container name"))
                        .args(remote_args()),
                )
                .subcommand(
                    Command::new("pod")
                        .about("Migrate a pod with all of its containers")
                        .arg(Arg::new("name").required(true).help("Pod name"))
                        .args(remote_args()),
                ),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("podshift.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
