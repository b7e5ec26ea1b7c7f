//! Main application entry point (native).

#[cfg(feature = "native")]
mod cli {
    use anyhow::{Context, Result};
    use clap::{Parser, Subcommand};
    use inkboard_app::{AppConfig, PollTask, Recording, RestStore, session_file};
    use inkboard_core::{
        BoardSnapshot, BoardState, Credentials, PostComposer, PostView, SessionContext, ThreadId,
    };
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::sync::Arc;

    #[derive(Parser)]
    #[command(name = "inkboard", version, about = "Discussion board with freehand drawing replies")]
    pub struct Cli {
        /// Config file (defaults to <config_dir>/inkboard/config.toml)
        #[arg(long, global = true)]
        config: Option<PathBuf>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// List pinned and ordinary threads
        Threads,
        /// Show the posts of a thread
        Posts { thread_id: ThreadId },
        /// Create a thread
        NewThread { title: String },
        /// Reply with text (Markdown)
        Post {
            thread_id: ThreadId,
            text: String,
            #[arg(long)]
            name: Option<String>,
        },
        /// Reply with a drawing replayed from recorded pointer events
        Draw {
            thread_id: ThreadId,
            #[arg(long)]
            events: PathBuf,
            #[arg(long)]
            name: Option<String>,
        },
        /// Print the board and refresh it periodically until Ctrl-C
        Watch,
        /// Sign in with email and password
        Login { email: String, password: String },
        /// Create an account
        Signup { email: String, password: String },
        /// Sign out and forget the stored session
        Logout,
    }

    fn print_board(board: &BoardState) {
        for (special, thread) in board.pinned().iter() {
            match thread {
                Some(thread) => println!("* {}\t{}", thread.id, thread.label()),
                None => println!("* {}", special.empty_message()),
            }
        }
        for thread in board.threads() {
            println!("{}\t{}", thread.id, thread.label());
        }
    }

    fn print_posts(board: &BoardState) {
        if let Some(thread) = board.selected_thread() {
            println!("== {} ==", thread.label());
        }
        for (number, post) in board.numbered_posts() {
            println!(
                "#{} {} ({}): {}",
                number,
                post.author_name,
                post.created_at.format("%Y-%m-%d %H:%M"),
                PostView::from_post(post).summary()
            );
        }
    }

    pub async fn run(cli: Cli) -> Result<()> {
        let config = match &cli.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)?;
                config.apply_env(|key| std::env::var(key).ok());
                config
            }
            None => AppConfig::load()?,
        };
        let store = Arc::new(RestStore::from_config(&config)?);

        let session_path = AppConfig::session_path()?;
        if let Some(session) = session_file::load(&session_path)? {
            store.set_session(Some(session))?;
        }

        let mut board = BoardState::new();
        match cli.command {
            Command::Threads => {
                board.refresh(store.as_ref()).await;
                print_board(&board);
            }
            Command::Posts { thread_id } => {
                board.refresh(store.as_ref()).await;
                board.select_thread(store.as_ref(), thread_id).await?;
                print_posts(&board);
            }
            Command::NewThread { title } => {
                board.new_thread_title = title;
                let thread = board.submit_thread(store.as_ref()).await?;
                println!("Created thread {}: {}", thread.id, thread.label());
            }
            Command::Post {
                thread_id,
                text,
                name,
            } => {
                let mut composer = PostComposer::new(config.surface_style());
                composer.name = name.unwrap_or_default();
                composer.set_text(text);
                board.select_thread(store.as_ref(), thread_id).await?;
                let post = board.submit_post(store.as_ref(), &mut composer).await?;
                println!("Posted #{} as {}", board.posts().len(), post.author_name);
            }
            Command::Draw {
                thread_id,
                events,
                name,
            } => {
                let recording = Recording::load(&events)?;
                let mut composer = PostComposer::new(config.surface_style());
                composer.name = name.unwrap_or_default();
                let summary =
                    recording.replay(&mut composer, config.canvas.width, config.canvas.height)?;
                println!("Replayed {} strokes, {} segments", summary.strokes, summary.segments);

                board.select_thread(store.as_ref(), thread_id).await?;
                let post = board.submit_post(store.as_ref(), &mut composer).await?;
                println!(
                    "Posted drawing #{} as {} ({} bytes)",
                    board.posts().len(),
                    post.author_name,
                    post.content.len()
                );
            }
            Command::Watch => {
                let board = Rc::new(RefCell::new(board));
                let snapshot = BoardSnapshot::fetch(store.as_ref()).await;
                board.borrow_mut().apply(snapshot);
                print_board(&board.borrow());

                let mut handle = PollTask::new(store.clone(), board.clone(), config.poll_interval())
                    .spawn(|board| {
                        println!("--");
                        print_board(board);
                    });
                tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
                handle.stop();
            }
            Command::Login { email, password } => {
                let mut session = SessionContext::new(store.clone());
                let signed_in = session.sign_in(&Credentials::new(email, password)).await?;
                session_file::save(&session_path, &signed_in)?;
                println!(
                    "Signed in as {}",
                    signed_in.user.email.as_deref().unwrap_or(&signed_in.user.id)
                );
            }
            Command::Signup { email, password } => {
                let mut session = SessionContext::new(store.clone());
                match session.sign_up(&Credentials::new(email, password)).await? {
                    Some(signed_in) => {
                        session_file::save(&session_path, &signed_in)?;
                        println!("Account created and signed in");
                    }
                    None => println!("Account created; check your email to confirm it"),
                }
            }
            Command::Logout => {
                let mut session = SessionContext::new(store.clone());
                session.subscribe(|event, _| log::debug!("Auth event: {:?}", event));
                session.init().await?;
                let result = session.sign_out().await;
                session_file::clear(&session_path)?;
                result?;
                println!("Signed out");
            }
        }
        Ok(())
    }
}

#[cfg(feature = "native")]
fn main() -> anyhow::Result<()> {
    use clap::Parser;

    env_logger::init();
    log::info!("Starting Inkboard");

    let cli = cli::Cli::parse();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    runtime.block_on(local.run_until(cli::run(cli)))
}

#[cfg(not(feature = "native"))]
fn main() {
    panic!("Native feature not enabled. Use `cargo run --features native`");
}
