//! `uplifter instance add|list|activate`.

use crate::cli::{AddInstanceArgs, InstanceCommand};
use anyhow::Context;
use serde::Serialize;
use uplift_core::{InstanceId, SettingsProvider, SettingsStore, TransportSelector};

/// One row of `instance list`. Credentials are never included.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: InstanceId,
    pub name: String,
    pub directory: String,
    pub filter: String,
    pub watcher_enabled: bool,
    pub transport: TransportSelector,
    pub target: Option<String>,
    pub active: bool,
}

pub fn execute(store: &dyn SettingsStore, command: InstanceCommand) -> anyhow::Result<()> {
    match command {
        InstanceCommand::Add(args) => {
            let id = add_instance(store, &args)?;
            println!("instance {} created and activated", id);
        }
        InstanceCommand::List { json } => {
            let rows = list_instances(store)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_table(&rows);
            }
        }
        InstanceCommand::Activate { id } => {
            store
                .set_active_instance(id)
                .with_context(|| format!("activating instance {}", id))?;
            println!("instance {} is now active", id);
        }
    }
    Ok(())
}

pub fn add_instance(store: &dyn SettingsStore, args: &AddInstanceArgs) -> anyhow::Result<InstanceId> {
    let id = store.register_instance().context("registering instance")?;

    let mut dir = store.watched_directory(id)?;
    dir.directory_path = args.directory.display().to_string();
    dir.file_extension = args.extension.clone();
    if let Some(name) = &args.name {
        dir.name = name.clone();
    }
    store.save_watched_directory(&dir)?;

    let mut ftp = store.ftp(id)?;
    set_if(&mut ftp.server, &args.ftp_server);
    set_if(&mut ftp.username, &args.ftp_user);
    set_if(&mut ftp.password, &args.ftp_password);
    set_if(&mut ftp.destination_folder, &args.ftp_folder);
    if let Some(port) = args.ftp_port {
        ftp.port = port;
    }
    store.save_ftp(&ftp)?;

    let mut sftp = store.sftp(id)?;
    set_if(&mut sftp.host, &args.sftp_host);
    set_if(&mut sftp.username, &args.sftp_user);
    set_if(&mut sftp.password, &args.sftp_password);
    set_if(&mut sftp.remote_path, &args.sftp_path);
    if let Some(port) = args.sftp_port {
        sftp.port = port;
    }
    if args.sftp_key.is_some() {
        sftp.key_path = args.sftp_key.clone();
    }
    store.save_sftp(&sftp)?;

    let mut activation = store.activation(id)?;
    activation.file_watcher_enabled = !args.disabled;
    activation.sftp_enabled = args.sftp;
    activation.ftp_enabled = !args.sftp;
    activation.settings_changed_since_notification = true;
    store.save_activation(&activation)?;

    tracing::info!(id, directory = %dir.directory_path, "instance registered");
    Ok(id)
}

pub fn list_instances(store: &dyn SettingsStore) -> anyhow::Result<Vec<InstanceSummary>> {
    let settings = store.instance_settings()?;
    let mut rows = Vec::with_capacity(settings.instance_count as usize);
    for id in 1..=settings.instance_count {
        let dir = store.watched_directory(id)?;
        let activation = store.activation(id)?;
        let transport = activation.transport();
        let target = match transport {
            TransportSelector::Ftp => {
                let ftp = store.ftp(id)?;
                Some(format!("ftp://{}:{}{}", ftp.server, ftp.port, ftp.destination_folder))
            }
            TransportSelector::Sftp => {
                let sftp = store.sftp(id)?;
                Some(format!("sftp://{}@{}:{}{}", sftp.username, sftp.host, sftp.port, sftp.remote_path))
            }
            TransportSelector::None => None,
        };
        rows.push(InstanceSummary {
            id,
            name: dir.name.clone(),
            directory: dir.directory_path.clone(),
            filter: dir.filter_pattern(),
            watcher_enabled: activation.file_watcher_enabled,
            transport,
            target,
            active: settings.active_instance == id,
        });
    }
    Ok(rows)
}

fn print_table(rows: &[InstanceSummary]) {
    if rows.is_empty() {
        println!("no instances configured");
        return;
    }
    println!("{:<4} {:<1} {:<24} {:<32} {:<8} {:<8} TARGET", "ID", "", "NAME", "DIRECTORY", "FILTER", "WATCH");
    for row in rows {
        println!(
            "{:<4} {:<1} {:<24} {:<32} {:<8} {:<8} {}",
            row.id,
            if row.active { "*" } else { "" },
            row.name,
            row.directory,
            row.filter,
            if row.watcher_enabled { "on" } else { "off" },
            row.target.as_deref().unwrap_or("-")
        );
    }
}

fn set_if(field: &mut String, value: &Option<String>) {
    if let Some(v) = value {
        *field = v.clone();
    }
}
