#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;

use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgGroup;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use yansi::Paint;

use super::ui;
use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AuthSession;
use crate::domain::models::BackendBox;
use crate::domain::models::ChatTranscript;
use crate::domain::models::Event;
use crate::domain::models::GenerationSession;
use crate::domain::models::GenerationStatus;
use crate::domain::services::ChatService;
use crate::domain::services::GenerationService;
use crate::infrastructure::backends::BackendManager;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn io::Write) {
    generate(gen, cmd, cmd.get_name().to_string(), out);
}

async fn load_auth() -> Result<AuthSession> {
    return AuthSession::load(path::PathBuf::from(Config::get(ConfigKey::AuthFile))).await;
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if let Some(parent) = config_file_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    let mut file = fs::File::create(&config_file_path).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    println!("Created default config file at {config_file_path_str}");
    return Ok(());
}

async fn prompt_password() -> Result<String> {
    print!("Password: ");
    io::Write::flush(&mut io::stdout())?;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    return match lines.next_line().await? {
        Some(password) => Ok(password),
        None => bail!("No password provided"),
    };
}

async fn login(backend: &BackendBox, matches: &ArgMatches) -> Result<()> {
    let mut auth = load_auth().await?;

    let (token, user) = if matches.get_flag("guest") {
        backend.guest_login().await?
    } else {
        let username = match matches.get_one::<String>("username") {
            Some(username) => username.to_string(),
            None => bail!("A username is required unless logging in with --guest"),
        };
        let password = match matches.get_one::<String>("password") {
            Some(password) => password.to_string(),
            None => prompt_password().await?,
        };
        backend.login(&username, &password).await?
    };

    auth.set(&token, user.clone());
    auth.save().await?;
    tracing::info!(username = user.username, "Logged in");

    println!("Logged in as {}", Paint::green(&user.username));
    return Ok(());
}

async fn logout() -> Result<()> {
    let mut auth = load_auth().await?;
    auth.clear().await?;
    println!("Logged out");
    return Ok(());
}

async fn whoami(backend: &BackendBox) -> Result<()> {
    let auth = load_auth().await?;
    if !auth.is_authenticated() {
        bail!("You are not logged in. Run `probank login` first.");
    }

    let user = backend.profile(&auth).await?;
    println!("{} <{}> (role {})", user.username, user.email, user.role);
    return Ok(());
}

async fn generate_answers(backend: &BackendBox, model: Option<String>) -> Result<bool> {
    let auth = load_auth().await?;
    if !auth.is_authenticated() {
        tracing::warn!("Starting answer generation without credentials");
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let mut session = GenerationSession::default();
    let job = async {
        let res = GenerationService::start(backend, &auth, &mut session, model, &tx).await;
        drop(tx);
        return res;
    };

    let (res, rendered) = tokio::join!(job, ui::render_events(&mut rx));
    rendered?;

    let outcome = res?;
    return Ok(outcome.status() == GenerationStatus::Completed);
}

async fn chat(backend: &BackendBox, problem_id: &str) -> Result<()> {
    let problem = backend.problem(problem_id).await?;
    ui::print_problem(&problem);

    let mut transcript = ChatTranscript::default();
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        ui::print_prompt()?;
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "/quit" || question == "/q" {
            break;
        }
        if question == "/clear" {
            transcript.clear()?;
            println!("Chat cleared.");
            continue;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
        let turn = async {
            let res = ChatService::send(backend, problem_id, &mut transcript, question, &tx).await;
            drop(tx);
            return res;
        };

        let (res, rendered) = tokio::join!(turn, ui::render_events(&mut rx));
        rendered?;

        // The failure was already rendered, keep the conversation going.
        if let Err(err) = res {
            tracing::warn!(error = ?err, "Chat turn failed");
        }
    }

    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn subcommand_debug() -> Command {
    return Command::new("debug")
        .about("Debug helpers for probank")
        .hide(true)
        .subcommand(
            Command::new("log-path").about("Output path to debug log file generated when running probank with environment variable RUST_LOG=probank")
        )
        .subcommand(
            Command::new("enum-config").about("List all config keys as strings.")
        );
}

fn subcommand_generate() -> Command {
    return Command::new("generate")
        .about("Generate answers for every problem that doesn't have one yet, following the job's progress live. Requires an admin login.")
        .arg(arg_model());
}

fn subcommand_chat() -> Command {
    return Command::new("chat")
        .about("Chat with the AI tutor about a problem. Questions are read line by line from stdin, /clear resets the conversation and /quit exits.")
        .arg(
            Arg::new("problem-id")
                .short('i')
                .long("id")
                .help("Problem ID")
                .num_args(1)
                .required(true),
        );
}

fn subcommand_login() -> Command {
    return Command::new("login")
        .about("Log in to the problem bank and store the token for later commands.")
        .arg(
            Arg::new("username")
                .short('u')
                .long("username")
                .num_args(1)
                .help("Account user name."),
        )
        .arg(
            Arg::new("password")
                .short('p')
                .long("password")
                .env("PROBANK_PASSWORD")
                .hide_env_values(true)
                .num_args(1)
                .help("Account password. Prompted for when omitted."),
        )
        .arg(
            Arg::new("guest")
                .long("guest")
                .action(ArgAction::SetTrue)
                .help("Log in as a guest."),
        )
        .group(
            ArgGroup::new("login-args")
                .args(["username", "guest"])
                .required(true),
        );
}

fn arg_model() -> Arg {
    return Arg::new(ConfigKey::Model.to_string())
        .short('m')
        .long(ConfigKey::Model.to_string())
        .env("PROBANK_MODEL")
        .num_args(1)
        .help("Model the server should use to generate answers. Uses the server's default when not set.");
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("probank")
        .about(about)
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(subcommand_chat())
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(subcommand_debug())
        .subcommand(subcommand_generate())
        .subcommand(subcommand_login())
        .subcommand(Command::new("logout").about("Forget the stored login."))
        .subcommand(Command::new("whoami").about("Show the logged in user."))
        .arg(arg_model())
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("PROBANK_CONFIG_FILE")
                .num_args(1)
                .help(format!("Path to configuration file [default: {}]", Config::default(ConfigKey::ConfigFile)))
                .global(true)
        )
        .arg(
            Arg::new(ConfigKey::ApiURL.to_string())
                .long(ConfigKey::ApiURL.to_string())
                .env("PROBANK_API_URL")
                .num_args(1)
                .help(format!("Problem bank API URL. [default: {}]", Config::default(ConfigKey::ApiURL)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::AuthFile.to_string())
                .long(ConfigKey::AuthFile.to_string())
                .env("PROBANK_AUTH_FILE")
                .num_args(1)
                .help(format!("Where the login token is stored. [default: {}]", Config::default(ConfigKey::AuthFile)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::HealthCheckTimeout.to_string())
                .long(ConfigKey::HealthCheckTimeout.to_string())
                .env("PROBANK_HEALTH_CHECK_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds before timing out when checking the API is reachable. [default: {}]", Config::default(ConfigKey::HealthCheckTimeout)))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("PROBANK_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!("Time to wait in milliseconds for regular API requests. Streams are not bound by it. [default: {}]", Config::default(ConfigKey::RequestTimeout)))
                .global(true),
        );
}

/// Runs the selected subcommand. Returns the process exit code.
pub async fn parse() -> Result<i32> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("debug", debug_matches)) => {
            match debug_matches.subcommand() {
                Some(("log-path", _)) => {
                    let log_path = Config::cache_dir().join("debug.log");
                    println!("{}", log_path.to_string_lossy());
                }
                Some(("enum-config", _)) => {
                    let res = ConfigKey::VARIANTS.join("\n");
                    println!("{}", res);
                }
                _ => {
                    subcommand_debug().print_long_help()?;
                }
            }
        }
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app, &mut io::stdout());
            }
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some(("generate", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let backend = BackendManager::get();
            backend.health_check().await?;

            let model = Some(Config::get(ConfigKey::Model));
            if !generate_answers(&backend, model).await? {
                return Ok(1);
            }
        }
        Some(("chat", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let backend = BackendManager::get();
            backend.health_check().await?;

            if let Some(problem_id) = subcmd_matches.get_one::<String>("problem-id") {
                chat(&backend, problem_id).await?;
            }
        }
        Some(("login", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            login(&BackendManager::get(), subcmd_matches).await?;
        }
        Some(("logout", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            logout().await?;
        }
        Some(("whoami", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            whoami(&BackendManager::get()).await?;
        }
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(0);
}
