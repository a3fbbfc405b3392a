// Copyright (C) 2024 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Level};

use crate::player::Player;

pub mod keyboard;
pub mod midi;

/// Controller events that will trigger behavior in the player.
#[derive(Debug)]
pub enum Event {
    /// Plays the track at the current position in the playlist.
    Play,

    /// Moves the current playlist position to the previous position.
    /// If a song is currently playing, does nothing.
    Prev,

    /// Moves the current playlist position to the next position.
    /// If a song is currently playing, does nothing.
    Next,

    /// Stops the currently playing song. If no song is playing, does nothing.
    Stop,

    /// Switches the playlist to the all songs playlist, which is an alphabetized
    /// playlist consisting of all songs in the song registry.
    AllSongs,

    /// Switches the playlist to the configured playlist.
    Playlist,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Controls a playlist.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(player: Player, driver: Arc<dyn Driver>) -> Result<Controller, Box<dyn Error>> {
        Ok(Controller {
            handle: tokio::spawn(async move { Controller::trigger_events(player, driver).await }),
        })
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Triggers player events by watching the driver and getting events from it.
    async fn trigger_events(mut player: Player, driver: Arc<dyn Driver>) {
        let span = span!(Level::INFO, "controller");
        let _enter = span.enter();

        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(
            first_song = player.get_playlist().current().name,
            "Controller started."
        );

        loop {
            if let Some(event) = events_rx.recv().await {
                info!(event = format!("{:?}", event), "Received event.");

                if let Err(e) = match event {
                    Event::Play => player.play().await,
                    Event::Prev => {
                        if let Err(e) = player.prev().await {
                            Err(e)
                        } else {
                            Ok(())
                        }
                    }
                    Event::Next => {
                        if let Err(e) = player.next().await {
                            Err(e)
                        } else {
                            Ok(())
                        }
                    }
                    Event::Stop => player.stop().await,
                    Event::AllSongs => player.switch_to_all_songs().await,
                    Event::Playlist => player.switch_to_playlist().await,
                } {
                    error!("Error talking to player: {}", e);
                }
            } else {
                info!("Controller closing.");
                if let Err(e) = join_handle.await {
                    error!("Error waiting for event monitor to stop: {}", e);
                }
                return;
            }
        }
    }
}
