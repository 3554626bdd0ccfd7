use crate::game::ClientGameState;
use crate::input::{parse_line, Command};
use log::{error, info, warn};
use shared::{FrameCodec, GridMap, Message, TICK_RATE};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};

pub struct Client {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    codec: FrameCodec,
    username: String,
    password: String,

    game_state: ClientGameState,
}

impl Client {
    pub async fn new(
        server_addr: &str,
        username: &str,
        password: &str,
        grid: GridMap,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        Ok(Client {
            reader,
            writer,
            codec: FrameCodec::new(),
            username: username.to_string(),
            password: password.to_string(),
            game_state: ClientGameState::new(grid),
        })
    }

    pub fn game_state(&self) -> &ClientGameState {
        &self.game_state
    }

    async fn send_message(&mut self, message: &Message) -> Result<(), Box<dyn std::error::Error>> {
        let frame = FrameCodec::encode(message)?;
        self.writer.write_all(&frame).await?;
        Ok(())
    }

    async fn login(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Logging in as {}...", self.username);
        let message = Message::CliLogin {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        self.send_message(&message).await
    }

    fn handle_message(&mut self, message: Message) {
        if let Message::SerChat { nickname, text } = &message {
            println!("[{}] {}", nickname, text);
        }
        self.game_state.apply(message);
    }

    fn print_status(&self) {
        let Some(local) = &self.game_state.local else {
            println!("not logged in");
            return;
        };
        let (x, y) = local.movement.cell();
        println!("{} at ({}, {})", local.data.nickname, x, y);
        for player in self.game_state.players.values() {
            let (x, y) = player.movement.cell();
            println!("  {} at ({}, {})", player.data.nickname, x, y);
        }
    }

    /// Runs until the server closes the connection, stdin ends or `/quit` is typed.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.login().await?;

        let mut stdin = BufReader::new(tokio::io::stdin()).lines();
        let mut buffer = [0u8; 4096];

        let mut tick_interval = interval(Duration::from_secs_f64(1.0 / TICK_RATE as f64));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Handle server messages
                read = self.reader.read(&mut buffer) => {
                    let len = read?;
                    if len == 0 {
                        warn!("Server closed the connection");
                        break;
                    }
                    for message in self.codec.decode(&buffer[..len])? {
                        self.handle_message(message);
                    }
                },

                // Handle console input
                line = stdin.next_line() => {
                    let Some(line) = line? else {
                        info!("Input closed, disconnecting");
                        break;
                    };
                    match parse_line(&line) {
                        Ok(Some(Command::Send(message))) => self.send_message(&message).await?,
                        Ok(Some(Command::Quit)) => break,
                        Ok(None) => self.print_status(),
                        Err(e) => error!("{}", e),
                    }
                },

                // Animate mirrored players
                _ = tick_interval.tick() => {
                    self.game_state.tick();
                },
            }
        }

        let _ = self.writer.shutdown().await;
        Ok(())
    }
}
