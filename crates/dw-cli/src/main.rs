use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dw_core::{init_tracing, AnalysisService, ConcordanceRequest, Config, UserId};
use dw_expr::{CastSpec, FilterCondition, FilterRequest};
use dw_frame::records::from_json_str;
use dw_graph::{NodeData, NodeId, NodeKind, WorkspaceId};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{debug, info};

fn workspace_arg() -> Arg {
    Arg::new("workspace").required(true).help("Workspace id")
}

fn node_arg() -> Arg {
    Arg::new("node").required(true).help("Node id")
}

fn cli() -> Command {
    Command::new("dw")
        .version(env!("CARGO_PKG_VERSION"))
        .about("DocWorkspace: persisted table analysis workspaces")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("default")
                .help("User whose workspaces to operate on"),
        )
        .subcommand(Command::new("list").about("List workspace summaries"))
        .subcommand(
            Command::new("create")
                .about("Create an empty workspace")
                .arg(Arg::new("name").required(true).help("Workspace name"))
                .arg(
                    Arg::new("description")
                        .long("description")
                        .default_value("")
                        .help("Workspace description"),
                ),
        )
        .subcommand(Command::new("info").about("Show workspace metadata").arg(workspace_arg()))
        .subcommand(Command::new("graph").about("Show nodes and edges").arg(workspace_arg()))
        .subcommand(Command::new("delete").about("Delete a workspace").arg(workspace_arg()))
        .subcommand(
            Command::new("import")
                .about("Add a root node from a JSON records file")
                .arg(workspace_arg())
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array of row objects"),
                )
                .arg(Arg::new("name").long("name").help("Node name (default: file stem)"))
                .arg(
                    Arg::new("document-column")
                        .long("document-column")
                        .help("Load as a document table on this text column"),
                ),
        )
        .subcommand(
            Command::new("rows")
                .about("Show one page of a node's rows")
                .arg(workspace_arg())
                .arg(node_arg())
                .arg(
                    Arg::new("page")
                        .long("page")
                        .default_value("1")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("page-size")
                        .long("page-size")
                        .default_value("20")
                        .value_parser(value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("filter")
                .about("Derive a node keeping matching rows")
                .arg(workspace_arg())
                .arg(node_arg())
                .arg(Arg::new("column").long("column").required(true))
                .arg(Arg::new("op").long("op").default_value("eq").help("Operator, e.g. gt, contains, between"))
                .arg(Arg::new("value").long("value").help("Operand; parsed as JSON when possible"))
                .arg(Arg::new("name").long("name").help("Name of the derived node")),
        )
        .subcommand(
            Command::new("cast")
                .about("Change a column's type in place")
                .arg(workspace_arg())
                .arg(node_arg())
                .arg(Arg::new("column").long("column").required(true))
                .arg(Arg::new("to").long("to").required(true).help("Target type"))
                .arg(Arg::new("format").long("format").help("Datetime format"))
                .arg(
                    Arg::new("strict")
                        .long("strict")
                        .action(ArgAction::SetTrue)
                        .help("Fail on unparseable datetimes"),
                ),
        )
        .subcommand(
            Command::new("convert")
                .about("Change a node's representation in place")
                .arg(workspace_arg())
                .arg(node_arg())
                .arg(
                    Arg::new("to")
                        .long("to")
                        .required(true)
                        .value_parser(value_parser!(NodeKind)),
                )
                .arg(Arg::new("document-column").long("document-column")),
        )
        .subcommand(
            Command::new("concordance")
                .about("Keyword-in-context search of a document node")
                .arg(workspace_arg())
                .arg(node_arg())
                .arg(Arg::new("column").long("column").required(true))
                .arg(Arg::new("word").long("word").required(true))
                .arg(Arg::new("regex").long("regex").action(ArgAction::SetTrue))
                .arg(
                    Arg::new("case-sensitive")
                        .long("case-sensitive")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("page")
                        .long("page")
                        .default_value("1")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("page-size")
                        .long("page-size")
                        .value_parser(value_parser!(usize)),
                ),
        )
}

fn text<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing argument '{name}'"))
}

fn count(args: &ArgMatches, name: &str) -> Result<usize> {
    args.get_one::<usize>(name)
        .copied()
        .with_context(|| format!("missing argument '{name}'"))
}

fn workspace(args: &ArgMatches) -> Result<WorkspaceId> {
    Ok(text(args, "workspace")?.parse()?)
}

fn node(args: &ArgMatches) -> Result<NodeId> {
    Ok(text(args, "node")?.parse()?)
}

/// Operand text as JSON, falling back to a plain string
fn operand(raw: Option<&String>) -> Value {
    raw.map_or(Value::Null, |raw| {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
    })
}

fn json(value: impl Serialize) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn run(service: &AnalysisService, user: &UserId, matches: &ArgMatches) -> Result<Value> {
    let manager = service.manager();
    match matches.subcommand() {
        Some(("list", _)) => json(manager.list_summaries(user)?.into_values().collect::<Vec<_>>()),
        Some(("create", args)) => {
            let created = manager.create(user, text(args, "name")?, text(args, "description")?)?;
            let summary = created.read().summary();
            json(summary)
        }
        Some(("info", args)) => json(manager.workspace_info(user, &workspace(args)?)?),
        Some(("graph", args)) => json(manager.graph(user, &workspace(args)?)?),
        Some(("delete", args)) => {
            let id = workspace(args)?;
            Ok(serde_json::json!({ "workspace": id, "deleted": service.delete_workspace(user, &id)? }))
        }
        Some(("import", args)) => {
            let id = workspace(args)?;
            let path = args.get_one::<PathBuf>("file").context("missing argument 'file'")?;
            let contents = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            let table = from_json_str(&contents)?;
            let name = match args.get_one::<String>("name") {
                Some(name) => name.clone(),
                None => path
                    .file_stem()
                    .map_or_else(|| "data".to_string(), |s| s.to_string_lossy().into_owned()),
            };
            let node = manager.add_node(user, &id, NodeData::Frame(table), &name, "upload", &[])?;
            info!(workspace = %id, node = %node, "table imported");
            match args.get_one::<String>("document-column") {
                Some(column) => json(service.convert(user, &id, node, NodeKind::DocDataFrame, Some(column))?),
                None => Ok(serde_json::json!({ "node": node, "name": name })),
            }
        }
        Some(("rows", args)) => json(service.node_page(
            user,
            &workspace(args)?,
            node(args)?,
            count(args, "page")?,
            count(args, "page-size")?,
        )?),
        Some(("filter", args)) => {
            let condition = FilterCondition::new(text(args, "column")?, text(args, "op")?, operand(args.get_one("value")));
            let mut request = FilterRequest::all(vec![condition]);
            if let Some(name) = args.get_one::<String>("name") {
                request = request.with_name(name.clone());
            }
            json(service.filter(user, &workspace(args)?, node(args)?, &request)?)
        }
        Some(("cast", args)) => {
            let mut spec = CastSpec::new(text(args, "column")?, text(args, "to")?).with_strict(args.get_flag("strict"));
            if let Some(format) = args.get_one::<String>("format") {
                spec = spec.with_format(format.clone());
            }
            json(service.cast(user, &workspace(args)?, node(args)?, &spec)?)
        }
        Some(("convert", args)) => {
            let target = *args.get_one::<NodeKind>("to").context("missing argument 'to'")?;
            let column = args.get_one::<String>("document-column").map(String::as_str);
            json(service.convert(user, &workspace(args)?, node(args)?, target, column)?)
        }
        Some(("concordance", args)) => {
            let mut request = ConcordanceRequest::new(text(args, "column")?, text(args, "word")?)
                .with_case_sensitive(args.get_flag("case-sensitive"));
            request.regex = args.get_flag("regex");
            request.page = count(args, "page")?;
            request.page_size = args.get_one::<usize>("page-size").copied();
            json(service.concordance(user, &workspace(args)?, node(args)?, &request)?)
        }
        Some((other, _)) => anyhow::bail!("unknown command '{other}'"),
        None => anyhow::bail!("no command given"),
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config_path = matches.get_one::<PathBuf>("config");
    let config = Config::load(config_path.map(PathBuf::as_path)).context("loading configuration")?;
    init_tracing(&config.log);
    debug!(data_root = %config.data_root.display(), "configuration loaded");

    let user: UserId = text(&matches, "user")?.parse()?;
    let service = AnalysisService::from_config(&config);
    let outcome = run(&service, &user, &matches);
    service.manager().shutdown()?;

    println!("{}", serde_json::to_string_pretty(&outcome?)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn operand_prefers_json() {
        assert_eq!(operand(Some(&"5".to_string())), serde_json::json!(5));
        assert_eq!(operand(Some(&"cat".to_string())), serde_json::json!("cat"));
        assert_eq!(operand(None), Value::Null);
    }

    #[test]
    fn create_then_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let service = AnalysisService::from_config(&Config::new().with_data_root(dir.path()));
        let user = UserId::new("cli").unwrap();

        let created = run(&service, &user, &cli().get_matches_from(["dw", "create", "survey"])).unwrap();
        assert_eq!(created["name"], serde_json::json!("survey"));

        let listed = run(&service, &user, &cli().get_matches_from(["dw", "list"])).unwrap();
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }
}
