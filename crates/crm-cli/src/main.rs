// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use crm_app::{Permission, RecordKind, UserId};
use crm_db::Store;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const BACKUP_FILE_NAME: &str = "crm_backup.json";

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_tracing();

    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `crm --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    let fresh = options.demo || !db_path.exists();
    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or CRM_DB_PATH",
            db_path.display()
        )
    })?;
    store.bootstrap()?;
    if options.demo {
        store.seed_demo_data()?;
    }
    if fresh && let Some(user) = config.default_user() {
        store
            .set_current_user(&UserId::new(user))
            .with_context(|| {
                format!(
                    "apply [session].default_user from {}",
                    options.config_path.display()
                )
            })?;
    }
    debug!(path = %db_path.display(), fresh, "store ready");

    if options.check_only {
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match &options.command {
        Some(command) => execute(&store, command, config.out_dir().as_deref(), &mut out),
        None => print_status(&store, &mut out),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CRM_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // An already-installed subscriber wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Export {
        kind: RecordKind,
        out: Option<PathBuf>,
    },
    Import {
        kind: RecordKind,
        file: PathBuf,
    },
    Template {
        kind: RecordKind,
        out: Option<PathBuf>,
    },
    ExportJson {
        out: Option<PathBuf>,
    },
    ImportJson {
        file: PathBuf,
    },
    Reset,
    WhoAmI,
    UseUser {
        id: UserId,
    },
    Pipeline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let mut positional = Vec::new();
    let mut out = None;
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--out" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--out requires a file path"))?;
                out = Some(PathBuf::from(value.as_ref()));
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            flag if flag.starts_with('-') => {
                bail!("unknown argument {flag:?}; run with --help to see supported options");
            }
            word => positional.push(word.to_owned()),
        }
    }

    if !positional.is_empty() {
        options.command = Some(parse_command(&positional, out)?);
    } else if out.is_some() {
        bail!("--out only applies to export, template, and export-json");
    }

    Ok(options)
}

fn parse_command(words: &[String], out: Option<PathBuf>) -> Result<Command> {
    let name = words[0].as_str();
    let args = &words[1..];
    if out.is_some() && !matches!(name, "export" | "template" | "export-json") {
        bail!("--out only applies to export, template, and export-json");
    }

    let command = match (name, args) {
        ("export", [kind]) => Command::Export {
            kind: parse_kind(kind)?,
            out,
        },
        ("template", [kind]) => Command::Template {
            kind: parse_kind(kind)?,
            out,
        },
        ("import", [kind, file]) => Command::Import {
            kind: parse_kind(kind)?,
            file: PathBuf::from(file),
        },
        ("export-json", []) => Command::ExportJson { out },
        ("import-json", [file]) => Command::ImportJson {
            file: PathBuf::from(file),
        },
        ("reset", []) => Command::Reset,
        ("whoami", []) => Command::WhoAmI,
        ("use-user", [id]) => Command::UseUser {
            id: UserId::new(id.as_str()),
        },
        ("pipeline", []) => Command::Pipeline,
        ("export" | "template", _) => bail!("usage: crm {name} <kind> [--out <path>]"),
        ("import", _) => bail!("usage: crm import <kind> <file>"),
        ("import-json", _) => bail!("usage: crm import-json <file>"),
        ("use-user", _) => bail!("usage: crm use-user <user-id>"),
        ("export-json" | "reset" | "whoami" | "pipeline", _) => {
            bail!("`{name}` takes no arguments")
        }
        _ => bail!("unknown command {name:?}; run with --help to see supported commands"),
    };
    Ok(command)
}

fn parse_kind(raw: &str) -> Result<RecordKind> {
    RecordKind::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = RecordKind::ALL.iter().map(|kind| kind.as_str()).collect();
        anyhow!(
            "unknown record kind {raw:?}; expected one of: {}",
            known.join(", ")
        )
    })
}

fn execute(
    store: &Store,
    command: &Command,
    out_dir: Option<&Path>,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Export { kind, out: path } => {
            let text = store.export_csv(*kind)?;
            emit(&text, path.as_deref(), out_dir, &kind.export_file_name(), out)
        }
        Command::Template { kind, out: path } => emit(
            &kind.template(),
            path.as_deref(),
            out_dir,
            &kind.template_file_name(),
            out,
        ),
        Command::Import { kind, file } => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("read import file {}", file.display()))?;
            let summary = store.import_csv(*kind, &text)?;
            writeln!(
                out,
                "imported {} {}",
                summary.imported,
                kind.label().to_lowercase()
            )?;
            if !summary.skipped_lines.is_empty() {
                let lines: Vec<String> = summary
                    .skipped_lines
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                writeln!(
                    out,
                    "skipped malformed line(s): {}",
                    lines.join(", ")
                )?;
            }
            if summary.assigned_ids > 0 {
                writeln!(out, "assigned {} new id(s)", summary.assigned_ids)?;
            }
            Ok(())
        }
        Command::ExportJson { out: path } => {
            let text = store.export_json()?;
            emit(&text, path.as_deref(), out_dir, BACKUP_FILE_NAME, out)
        }
        Command::ImportJson { file } => {
            let text = fs::read_to_string(file)
                .with_context(|| format!("read backup file {}", file.display()))?;
            let data = store.import_json(&text)?;
            writeln!(
                out,
                "restored {} clients, {} deals, {} users; signed in as {}",
                data.clients.len(),
                data.deals.len(),
                data.users.len(),
                data.current_user.name
            )?;
            Ok(())
        }
        Command::Reset => {
            store.reset_data()?;
            writeln!(out, "restored demo data")?;
            Ok(())
        }
        Command::WhoAmI => {
            let user = store.current_user()?;
            let role = store
                .list_roles()?
                .into_iter()
                .find(|role| role.id == user.role_id);
            let role_name = role
                .as_ref()
                .map_or_else(|| format!("{} (missing)", user.role_id), |role| role.name.clone());
            writeln!(out, "{} <{}> [{}] {}", user.name, user.email, user.id, role_name)?;

            let granted: Vec<&str> = Permission::ALL
                .into_iter()
                .filter(|permission| role.as_ref().is_some_and(|role| role.allows(*permission)))
                .map(Permission::label)
                .collect();
            if granted.is_empty() {
                writeln!(out, "permissions: none")?;
            } else {
                writeln!(out, "permissions: {}", granted.join(", "))?;
            }
            Ok(())
        }
        Command::UseUser { id } => {
            let user = store.set_current_user(id)?;
            writeln!(out, "signed in as {} [{}]", user.name, user.id)?;
            Ok(())
        }
        Command::Pipeline => {
            let summary = store.pipeline_summary()?;
            writeln!(
                out,
                "open: {} deal(s), {:.2}",
                summary.open_deals, summary.open_value
            )?;
            writeln!(
                out,
                "won:  {} deal(s), {:.2}",
                summary.won_deals, summary.won_value
            )?;
            writeln!(out, "lost: {} deal(s)", summary.lost_deals)?;
            Ok(())
        }
    }
}

/// Writes to `path`, else into `out_dir` under `file_name`, else to `out`.
fn emit(
    contents: &str,
    path: Option<&Path>,
    out_dir: Option<&Path>,
    file_name: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let target = match (path, out_dir) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(dir)) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("create export directory {}", dir.display()))?;
            dir.join(file_name)
        }
        (None, None) => {
            writeln!(out, "{contents}")?;
            return Ok(());
        }
    };
    fs::write(&target, contents).with_context(|| format!("write {}", target.display()))?;
    writeln!(out, "wrote {}", target.display())?;
    Ok(())
}

fn print_status(store: &Store, out: &mut dyn Write) -> Result<()> {
    let user = store.current_user()?;
    writeln!(out, "signed in as {} [{}]", user.name, user.id)?;
    writeln!(
        out,
        "{} clients, {} contacts, {} projects, {} deals, {} tasks",
        store.list_clients()?.len(),
        store.list_contact_persons()?.len(),
        store.list_projects()?.len(),
        store.list_deals()?.len(),
        store.list_tasks()?.len()
    )?;
    writeln!(out, "run `crm --help` for commands")?;
    Ok(())
}

fn print_help() {
    println!("crm");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Run against seeded demo data (in-memory)");
    println!("  --check                  Validate config + DB and exit");
    println!("  --help                   Show this help");
    println!();
    println!("commands (kind: clients, contactPersons, projects, deals, tasks)");
    println!("  export <kind> [--out <path>]   Export a collection as CSV");
    println!("  import <kind> <file>           Replace a collection from CSV");
    println!("  template <kind> [--out <path>] Header-only CSV for a collection");
    println!("  export-json [--out <path>]     Back up every collection as JSON");
    println!("  import-json <file>             Restore a JSON backup");
    println!("  reset                          Restore the demo data");
    println!("  whoami                         Show the signed-in user and their permissions");
    println!("  use-user <id>                  Switch the signed-in user");
    println!("  pipeline                       Summarize open, won, and lost deals");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, emit, execute, parse_cli_args};
    use anyhow::Result;
    use crm_app::{RecordKind, UserId};
    use crm_db::Store;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/crm-config.toml")
    }

    fn demo_store() -> Result<Store> {
        let store = Store::open_memory()?;
        store.bootstrap()?;
        store.seed_demo_data()?;
        Ok(store)
    }

    fn run_command(store: &Store, command: &Command) -> Result<String> {
        let mut out = Vec::new();
        execute(store, command, None, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_db_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
                command: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_reads_export_with_out_anywhere() -> Result<()> {
        let options = parse_cli_args(
            vec!["--out", "/tmp/deals.csv", "export", "deals", "--demo"],
            default_options_path(),
        )?;
        assert!(options.demo);
        assert_eq!(
            options.command,
            Some(Command::Export {
                kind: RecordKind::Deals,
                out: Some(PathBuf::from("/tmp/deals.csv")),
            })
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_reads_import_and_use_user() -> Result<()> {
        let options = parse_cli_args(
            vec!["import", "contacts", "people.csv"],
            default_options_path(),
        )?;
        assert_eq!(
            options.command,
            Some(Command::Import {
                kind: RecordKind::ContactPersons,
                file: PathBuf::from("people.csv"),
            })
        );

        let options = parse_cli_args(vec!["use-user", "user-3"], default_options_path())?;
        assert_eq!(
            options.command,
            Some(Command::UseUser {
                id: UserId::new("user-3")
            })
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_rejects_bad_commands() {
        let cases: [(&[&str], &str); 6] = [
            (&["export", "activities"], "unknown record kind"),
            (&["export"], "usage: crm export"),
            (&["import", "deals"], "usage: crm import"),
            (&["whoami", "now"], "takes no arguments"),
            (&["frobnicate"], "unknown command"),
            (&["reset", "--out", "x.csv"], "--out only applies"),
        ];
        for (args, expected) in cases {
            let error = parse_cli_args(args.iter().copied(), default_options_path())
                .expect_err("bad command should fail");
            assert!(
                error.to_string().contains(expected),
                "args {args:?}: {error}"
            );
        }
    }

    #[test]
    fn stray_out_without_command_is_rejected() {
        let error = parse_cli_args(vec!["--out", "x.csv"], default_options_path())
            .expect_err("--out alone should fail");
        assert!(error.to_string().contains("--out only applies"));
    }

    #[test]
    fn export_prints_csv_to_stdout_without_out_dir() -> Result<()> {
        let store = demo_store()?;
        let output = run_command(
            &store,
            &Command::Export {
                kind: RecordKind::Clients,
                out: None,
            },
        )?;
        assert!(output.starts_with("id,name,website,createdDate,ownerId\n"));
        assert!(output.contains("client-1,Big Tech Inc.,https://bigtech.com"));
        Ok(())
    }

    #[test]
    fn export_then_import_through_files() -> Result<()> {
        let store = demo_store()?;
        let temp = tempfile::tempdir()?;
        let mut out = Vec::new();
        execute(
            &store,
            &Command::Export {
                kind: RecordKind::Projects,
                out: None,
            },
            Some(temp.path()),
            &mut out,
        )?;
        let file = temp.path().join("projects.csv");
        assert!(String::from_utf8(out)?.contains("wrote"));
        assert!(std::fs::read_to_string(&file)?.contains("person-1;person-3"));

        let output = run_command(&store, &Command::Import {
            kind: RecordKind::Projects,
            file,
        })?;
        assert_eq!(output, "imported 5 projects\n");
        Ok(())
    }

    #[test]
    fn import_reports_skipped_lines() -> Result<()> {
        let store = demo_store()?;
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("tasks.csv");
        std::fs::write(
            &file,
            "id,title,description,dueDate,priority,status,projectId,dealId\n\
             task-1,Call,,2024-08-10,High,To Do,project-1,\n\
             task-2,Broken\n",
        )?;
        let output = run_command(&store, &Command::Import {
            kind: RecordKind::Tasks,
            file,
        })?;
        assert!(output.contains("imported 1 tasks"));
        assert!(output.contains("skipped malformed line(s): 3"));
        Ok(())
    }

    #[test]
    fn template_writes_header_only_file() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("deals_template.csv");
        let mut out = Vec::new();
        emit(
            &RecordKind::Deals.template(),
            Some(path.as_path()),
            None,
            "ignored.csv",
            &mut out,
        )?;
        assert_eq!(
            std::fs::read_to_string(&path)?,
            "id,name,value,stage,projectId,expectedCloseDate,notes"
        );
        Ok(())
    }

    #[test]
    fn whoami_and_use_user_follow_the_session() -> Result<()> {
        let store = demo_store()?;
        let output = run_command(&store, &Command::WhoAmI)?;
        assert!(output.starts_with("Alex Johnson <alex@crm.ai> [user-1] Admin\npermissions: "));
        assert!(output.contains("View Dashboard"));
        assert!(output.contains("Manage Roles"));

        run_command(&store, &Command::UseUser {
            id: UserId::new("user-4"),
        })?;
        let output = run_command(&store, &Command::WhoAmI)?;
        assert!(output.contains("Chen Lee"));
        assert!(output.contains("Sales Rep"));
        assert!(output.contains("Manage Deals"));
        assert!(!output.contains("View Reports"));
        Ok(())
    }

    #[test]
    fn pipeline_needs_reports_permission() -> Result<()> {
        let store = demo_store()?;
        let output = run_command(&store, &Command::Pipeline)?;
        assert!(output.contains("open: 5 deal(s), 290000.00"));

        store.set_current_user(&UserId::new("user-3"))?;
        let error = run_command(&store, &Command::Pipeline).expect_err("rep lacks reports");
        assert!(error.to_string().contains("viewReports"));
        Ok(())
    }

    #[test]
    fn json_backup_round_trips_through_a_file() -> Result<()> {
        let store = demo_store()?;
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("backup.json");
        run_command(&store, &Command::ExportJson {
            out: Some(path.clone()),
        })?;
        run_command(&store, &Command::Reset)?;
        let output = run_command(&store, &Command::ImportJson { file: path })?;
        assert!(output.contains("restored 4 clients, 6 deals, 4 users"));
        Ok(())
    }
}
