// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger, web};
use log::info;
use std::sync::Arc;

use studio::app_state::AppState;
use studio::bootstrap::{self, BootstrapResult};
use studio::config::ValidatedConfig;
use studio::iam::{JwtAuthMiddlewareFactory, UserServices};
use studio::runtime_paths::RuntimePaths;
use studio::{api, util};

const HELP_TEXT: &str = "\
Usage: studio [-C <root>] [-F] [command]

Without a command the authoring server starts in the foreground.

Options:
  -C <root>       Runtime root holding config.yaml, users.yaml and state/
  -F              Run in the foreground (the only mode; kept for compatibility)
  -h, --help      Show this help

Commands:
  token <email>   Print a signed token for a user listed in users.yaml
  help            Show this help
";

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the runtime directory.");
            return 1;
        }
    };

    if matches!(parsed_args.mode, RunMode::Help) {
        print!("{}", HELP_TEXT);
        return 0;
    }

    let bootstrap = match bootstrap::bootstrap_runtime(&parsed_args.runtime_root) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("❌ Bootstrap error: {}", error);
            eprintln!("❌ Application cannot start with invalid configuration.");
            return 1;
        }
    };

    if let RunMode::Token(email) = parsed_args.mode {
        return print_token(&bootstrap, &email);
    }

    match System::new().block_on(run_server(bootstrap)) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("❌ Server failed to start: {}", error);
            1
        }
    }
}

fn print_token(bootstrap: &BootstrapResult, email: &str) -> i32 {
    let user_services = match UserServices::new(
        &bootstrap.validated_config,
        &bootstrap.runtime_paths.users_file,
    ) {
        Ok(services) => services,
        Err(error) => {
            eprintln!("❌ Failed to load users: {}", error);
            return 1;
        }
    };
    match user_services.issue_token(email) {
        Ok(token) => {
            println!("{}", token);
            0
        }
        Err(error) => {
            eprintln!("❌ Failed to issue token for {}: {}", email, error);
            1
        }
    }
}

async fn run_server(bootstrap: BootstrapResult) -> std::io::Result<()> {
    let validated_config = Arc::new(bootstrap.validated_config);
    let runtime_paths = bootstrap.runtime_paths;

    let logger = util::build_logger(util::parse_level_filter(&validated_config.logging.level));
    util::init_logger(util::default_rules(), logger).map_err(|error| {
        eprintln!("❌ Failed to initialize logger: {}", error);
        std::io::Error::other(error.to_string())
    })?;

    log_startup_info(&validated_config, &runtime_paths);
    if bootstrap.created_config {
        info!("Created default {}", runtime_paths.config_file.display());
    }
    if bootstrap.created_users {
        info!("Created default {}", runtime_paths.users_file.display());
    }

    let user_services = match UserServices::new(&validated_config, &runtime_paths.users_file) {
        Ok(services) => Arc::new(services),
        Err(error) => {
            eprintln!("❌ Failed to initialize user services: {}", error);
            eprintln!("❌ Application cannot start without user services.");
            return Err(std::io::Error::other(error.to_string()));
        }
    };
    info!("✅ User services initialized successfully");

    let app_state = match AppState::from_config(&validated_config, &runtime_paths) {
        Ok(state) => Arc::new(state),
        Err(error) => {
            eprintln!("❌ Failed to open item stores: {}", error);
            return Err(std::io::Error::other(error.to_string()));
        }
    };
    info!(
        "✅ Item stores ready ({} course(s), persistence {})",
        validated_config.courses.len(),
        if validated_config.store.persist { "on" } else { "off" }
    );

    let host = validated_config.server.host.clone();
    let port = validated_config.server.port;
    let workers = validated_config.server.workers;

    let user_services_data = web::Data::from(user_services);
    let app_state_data = web::Data::from(app_state);

    info!("🚀 Listening on http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .app_data(user_services_data.clone())
            .app_data(app_state_data.clone())
            .wrap(JwtAuthMiddlewareFactory)
            .wrap(Logger::default())
            .configure(api::configure)
    })
    .workers(workers)
    .bind((host.as_str(), port))?
    .run()
    .await
}

fn log_startup_info(config: &ValidatedConfig, runtime_paths: &RuntimePaths) {
    info!("{} starting: {}", config.app.name, config.app.description);
    info!("Runtime root: {}", runtime_paths.root.display());
    info!("Config file: {}", runtime_paths.config_file.display());
    info!("Users file: {}", runtime_paths.users_file.display());
    info!("State directory: {}", runtime_paths.state_dir.display());
    for course in &config.courses {
        info!("Course configured: {}/{}/{}", course.org, course.course, course.run);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {}", current_dir.display());
    }
}

#[derive(Debug)]
enum RunMode {
    Serve,
    Token(String),
    Help,
}

struct ParsedArgs {
    runtime_root: std::path::PathBuf,
    mode: RunMode,
}

fn parse_args() -> Result<ParsedArgs, String> {
    parse_args_from(std::env::args().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    if args.iter().any(|arg| is_help_flag(arg)) {
        return Ok(ParsedArgs {
            runtime_root: std::path::PathBuf::from("."),
            mode: RunMode::Help,
        });
    }

    let mut args = args.into_iter();
    let mut runtime_root = std::path::PathBuf::from(".");
    let mut cli_tokens = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" || arg == "-F" {
            continue;
        } else if arg == "-C" {
            let value = args
                .next()
                .ok_or_else(|| "Missing value for -C".to_string())?;
            runtime_root = std::path::PathBuf::from(value);
        } else {
            cli_tokens.push(arg);
        }
    }

    let runtime_root = make_runtime_root_absolute(runtime_root)?;

    let mode = match cli_tokens.as_slice() {
        [] => RunMode::Serve,
        [command] if command.eq_ignore_ascii_case("help") => RunMode::Help,
        [command, email] if command == "token" => RunMode::Token(email.clone()),
        [command] if command == "token" => {
            return Err("token requires a user email".to_string());
        }
        _ => return Err(format!("Unknown command: {}", cli_tokens.join(" "))),
    };

    Ok(ParsedArgs { runtime_root, mode })
}

fn is_help_flag(arg: &str) -> bool {
    arg == "-h" || arg == "--help"
}

fn make_runtime_root_absolute(
    runtime_root: std::path::PathBuf,
) -> Result<std::path::PathBuf, String> {
    if runtime_root.is_absolute() {
        return Ok(runtime_root);
    }

    let current_dir = std::env::current_dir()
        .map_err(|error| format!("Failed to resolve current directory: {}", error))?;
    Ok(current_dir.join(runtime_root))
}
