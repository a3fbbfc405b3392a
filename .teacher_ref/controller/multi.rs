// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
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
use std::{io, sync::Arc};

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use super::Event;
use crate::controller;

pub enum SubDriver {
    Keyboard(Arc<controller::keyboard::Driver>),
    Midi(Arc<controller::midi::Driver>),
}

/// A controller that controls a player using multiple other drivers.
pub struct Driver {
    /// The device that the driver will monitor.
    sub_drivers: Vec<SubDriver>,
}
impl Driver {
    pub fn new(sub_drivers: Vec<SubDriver>) -> Driver {
        Driver { sub_drivers }
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        let join_handles = self
            .sub_drivers
            .iter()
            .map(|driver| match driver {
                SubDriver::Midi(arc) => arc.as_ref().monitor_events(events_tx.clone()),
                SubDriver::Keyboard(arc) => arc.as_ref().monitor_events(events_tx.clone()),
            })
            .collect::<Vec<_>>();

        tokio::spawn(async move {
            let results = futures::future::join_all(join_handles).await;
            if results.iter().all(|result| result.is_ok()) {
                Ok(())
            } else {
                Err(io::Error::last_os_error())
            }
        })
    }
}
