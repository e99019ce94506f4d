use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use campus_core::{
    AppViewModel, ExportFilters, ImportSource, JobState, MonitorPhase, Msg, PasswordContext,
    PasswordPolicy,
};
use campus_engine::{AuthenticatedClient, ClientSettings, Registration, Session, SessionStore};
use campus_logging::campus_info;

use crate::app::BulkApp;
use crate::cli::{Args, Command};

pub async fn run(args: Args) -> Result<()> {
    let settings = args.client_settings()?;
    let poll = args.poll_settings();
    let store = SessionStore::new(args.state_dir.clone());

    match args.command {
        Command::Login { username, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            let client = AuthenticatedClient::new(settings, Session::anonymous())?;
            let tokens = client.login(&username, &password).await?;
            store.save(&tokens.access, tokens.refresh.as_deref(), Some(&username))?;
            println!("Signed in as {username}");
        }
        Command::Logout => {
            store.clear()?;
            println!("Signed out");
        }
        Command::Whoami => {
            let client = signed_in_client(settings, &store)?;
            let me = client.me().await?;
            match me.role {
                Some(role) => println!("{} (id {}, {role})", me.username, me.id),
                None => println!("{} (id {})", me.username, me.id),
            }
        }
        Command::Export {
            code,
            title,
            output,
        } => {
            let client = signed_in_client(settings, &store)?;
            let msg = Msg::ExportRequested {
                filters: ExportFilters { code, title },
            };
            let view = BulkApp::new(client, poll, output).run(msg).await?;
            finish_job(view)?;
        }
        Command::Import { file, file_url } => {
            let source = match (file, file_url) {
                (Some(path), None) => ImportSource::File(path),
                (None, Some(url)) => ImportSource::Url(url),
                _ => bail!("give either a CSV file or --file-url"),
            };
            let client = signed_in_client(settings, &store)?;
            let view = BulkApp::new(client, poll, args.state_dir)
                .run(Msg::ImportRequested { source })
                .await?;
            finish_job(view)?;
        }
        Command::Register {
            username,
            email,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password: ")?,
            };
            check_password(
                &password,
                PasswordContext {
                    username: Some(&username),
                    email: Some(&email),
                },
            )?;
            let client = AuthenticatedClient::new(settings, Session::anonymous())?;
            let detail = client
                .register(Registration {
                    username: &username,
                    email: &email,
                    password: &password,
                })
                .await?;
            campus_info!("Registered {}", username);
            println!("{detail}");
        }
        Command::ForgotUsername { email } => {
            let client = AuthenticatedClient::new(settings, Session::anonymous())?;
            println!("{}", client.forgot_username(&email).await?);
        }
        Command::ForgotPassword { email } => {
            let client = AuthenticatedClient::new(settings, Session::anonymous())?;
            println!("{}", client.forgot_password(&email).await?);
        }
        Command::ResetPassword { uid, token, new } => {
            let new = match new {
                Some(new) => new,
                None => prompt("New password: ")?,
            };
            check_password(&new, PasswordContext::default())?;
            let client = AuthenticatedClient::new(settings, Session::anonymous())?;
            println!("{}", client.reset_password(&uid, &token, &new).await?);
        }
        Command::CheckPassword {
            password,
            username,
            email,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt("Password to check: ")?,
            };
            let context = PasswordContext {
                username: username.as_deref(),
                email: email.as_deref(),
            };
            check_password(&password, context)?;
            println!("Password meets the policy");
        }
        Command::ChangePassword { old, new } => {
            let client = signed_in_client(settings, &store)?;
            let old = match old {
                Some(old) => old,
                None => prompt("Current password: ")?,
            };
            let new = match new {
                Some(new) => new,
                None => prompt("New password: ")?,
            };
            let username = store.username();
            check_password(
                &new,
                PasswordContext {
                    username: username.as_deref(),
                    email: None,
                },
            )?;
            client.change_password(&old, &new).await?;
            campus_info!("Password changed for {:?}", username);
            println!("Password updated");
        }
    }
    Ok(())
}

fn signed_in_client(settings: ClientSettings, store: &SessionStore) -> Result<AuthenticatedClient> {
    let session = store.load();
    if session.token().is_none() {
        bail!("not signed in; run `campus login` first");
    }
    Ok(AuthenticatedClient::new(settings, session)?)
}

fn check_password(password: &str, context: PasswordContext<'_>) -> Result<()> {
    let violations = PasswordPolicy::default().check(password, context);
    if violations.is_empty() {
        return Ok(());
    }
    let lines: Vec<String> = violations
        .iter()
        .map(|violation| format!("  - {violation}"))
        .collect();
    Err(anyhow!("password rejected:\n{}", lines.join("\n")))
}

fn finish_job(view: AppViewModel) -> Result<()> {
    if view.job_state == Some(JobState::Succeeded) {
        return Ok(());
    }
    // Submission failures leave no task id; terminal failures leave the monitor done.
    if view.task_id.is_none() || view.phase == MonitorPhase::Done {
        let notice = view.notice.unwrap_or_else(|| "job did not finish".to_string());
        return Err(anyhow!(notice));
    }
    Err(anyhow!("stopped before the job finished"))
}

fn prompt(label: &str) -> Result<String> {
    eprint!("{label}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("could not read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
