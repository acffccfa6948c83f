use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Context, Result};
use onepager_core::{update, Msg, UploadedFile, WizardState};
use onepager_engine::{BackendConfig, EngineEvent, EngineHandle, WorkflowRequest};
use onepager_logging::{wizard_info, wizard_warn};

use super::effects::EffectRunner;
use super::input::{self, Command, HELP};
use super::render::Renderer;

/// Everything the wizard loop reacts to.
pub enum AppEvent {
    Msg(Msg),
    Input(String),
    InputClosed,
}

pub fn run_wizard(config: BackendConfig) -> Result<()> {
    let engine = EngineHandle::new(config).context("starting the engine")?;
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let runner = EffectRunner::new(engine, event_tx.clone());
    spawn_stdin_reader(event_tx);

    let mut state = WizardState::new();
    let mut renderer = Renderer::default();
    println!("{HELP}\n");
    print_frame(&mut renderer, &state);

    while let Ok(event) = event_rx.recv() {
        let msgs = match event {
            AppEvent::Msg(msg) => vec![msg],
            AppEvent::Input(line) if line.trim().is_empty() => continue,
            AppEvent::Input(line) => match input::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Help) => {
                    println!("{HELP}");
                    continue;
                }
                Ok(command) => match command_msgs(command, &state) {
                    Ok(msgs) => msgs,
                    Err(err) => {
                        println!("  ! {err}");
                        continue;
                    }
                },
                Err(err) => {
                    println!("  ! {err}");
                    continue;
                }
            },
            AppEvent::InputClosed => break,
        };

        for msg in msgs {
            let (next, effects) = update(state, msg);
            state = next;
            runner.execute(effects);
        }
        if state.consume_dirty() {
            print_frame(&mut renderer, &state);
        }
    }

    // Leaving cancels whatever is still in flight.
    wizard_info!("Wizard closed at step {:?}", state.step());
    let (_, effects) = update(state, Msg::Restart);
    runner.execute(effects);
    runner.shutdown();
    Ok(())
}

fn print_frame(renderer: &mut Renderer, state: &WizardState) {
    let frame = renderer.frame(&state.view());
    if !frame.is_empty() {
        print!("{frame}");
        let _ = io::stdout().flush();
    }
}

fn spawn_stdin_reader(event_tx: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if event_tx.send(AppEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = event_tx.send(AppEvent::InputClosed);
    });
}

/// Translate a typed command into wizard messages.
fn command_msgs(command: Command, state: &WizardState) -> Result<Vec<Msg>> {
    let msgs = match command {
        Command::Name(text) => vec![Msg::CompanyNameChanged(text)],
        Command::Url(text) => vec![Msg::WebsiteChanged(text)],
        Command::Find => vec![Msg::FindCompanyClicked],
        Command::Pick(n) => vec![Msg::SuggestionPicked(n)],
        Command::Dismiss => vec![Msg::SuggestionsDismissed],
        Command::About(field) => vec![Msg::AboutToggled(field)],
        Command::Toggle(n) => vec![Msg::OperationToggled(n)],
        Command::Heading { index, text } => vec![
            Msg::OperationKeyEdited { index, text },
            Msg::OperationKeyCommitted(index),
        ],
        Command::Describe { index, text } => vec![Msg::OperationValueEdited { index, text }],
        Command::Revert(n) => vec![Msg::OperationKeyReverted(n)],
        Command::Add {
            heading,
            description,
        } => vec![Msg::OperationAdded {
            heading,
            description,
        }],
        Command::Query(text) => vec![Msg::OperationsQueryChanged(text)],
        Command::File(path) => vec![Msg::FileSelected(uploaded_file(&path)?)],
        Command::Submit => match state.active_step() {
            Some(step) => vec![Msg::SubmitStep(step)],
            None => bail!("nothing to submit right now"),
        },
        Command::Edit(turn) => vec![Msg::EditTurn(turn)],
        Command::Cancel => vec![Msg::CancelGeneration],
        Command::Restart => vec![Msg::Restart],
        Command::Help | Command::Quit => Vec::new(),
    };
    Ok(msgs)
}

fn uploaded_file(path: &Path) -> Result<UploadedFile> {
    let meta = std::fs::metadata(path).with_context(|| format!("cannot open {}", path.display()))?;
    if !meta.is_file() {
        bail!("{} is not a file", path.display());
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(UploadedFile {
        name,
        path: path.to_path_buf(),
        size: meta.len(),
    })
}

/// Run a single-request workflow and wait for its file.
pub fn run_workflow(config: BackendConfig, request: WorkflowRequest) -> Result<()> {
    request.validate()?;
    let engine = EngineHandle::new(config).context("starting the engine")?;
    engine.run_workflow(request);
    println!("Working...");

    let result = loop {
        match engine.recv() {
            Some(EngineEvent::WorkflowFinished { result }) => break result,
            Some(other) => wizard_warn!("Ignoring unexpected event {:?}", other),
            None => bail!("the engine stopped before the workflow finished"),
        }
    };
    engine.shutdown();

    match result {
        Ok(saved) => {
            println!("Saved {} ({} bytes)", saved.path.display(), saved.byte_len);
            Ok(())
        }
        Err(err) => bail!("{err}"),
    }
}
