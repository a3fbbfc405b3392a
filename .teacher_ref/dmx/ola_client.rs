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

use std::error::Error;

/// Trait for OLA client functionality
pub trait OlaClient: Send + Sync {
    /// Send DMX data to a universe
    fn send_dmx(&mut self, universe: u32, buffer: &ola::DmxBuffer) -> Result<(), Box<dyn Error>>;
}

/// Real OLA client implementation
pub struct RealOlaClient {
    client: ola::StreamingClient<std::net::TcpStream>,
}

impl RealOlaClient {
    pub fn new(client: ola::StreamingClient<std::net::TcpStream>) -> Self {
        Self { client }
    }
}

impl OlaClient for RealOlaClient {
    fn send_dmx(&mut self, universe: u32, buffer: &ola::DmxBuffer) -> Result<(), Box<dyn Error>> {
        self.client.send_dmx(universe, buffer)?;
        Ok(())
    }
}

#[cfg(test)]
/// Mock OLA client for testing
pub struct MockOlaClient {
    pub sent_messages: std::sync::Arc<std::sync::Mutex<Vec<DmxMessage>>>,
    pub should_fail: bool,
}

#[cfg(test)]
#[derive(Debug, Clone)]
pub struct DmxMessage {
    pub universe: u32,
    pub buffer: ola::DmxBuffer,
}

#[cfg(test)]
impl MockOlaClient {
    pub fn new() -> Self {
        Self {
            sent_messages: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Get the number of messages sent
    pub fn message_count(&self) -> usize {
        self.sent_messages.lock().unwrap().len()
    }

    /// Get the last sent message
    pub fn get_last_message(&self) -> Option<DmxMessage> {
        self.sent_messages.lock().unwrap().last().cloned()
    }

    /// Clear all sent messages
    pub fn clear_messages(&self) {
        self.sent_messages.lock().unwrap().clear();
    }

    /// Get messages for a specific universe
    pub fn get_messages_for_universe(&self, universe: u32) -> Vec<DmxMessage> {
        self.sent_messages
            .lock()
            .unwrap()
            .iter()
            .filter(|msg| msg.universe == universe)
            .cloned()
            .collect()
    }

    /// Get the DMX buffer for a specific universe from the last message
    pub fn get_buffer_for_universe(&self, universe: u32) -> Option<ola::DmxBuffer> {
        self.get_messages_for_universe(universe)
            .last()
            .map(|msg| msg.buffer.clone())
    }
}

#[cfg(test)]
impl OlaClient for MockOlaClient {
    fn send_dmx(&mut self, universe: u32, buffer: &ola::DmxBuffer) -> Result<(), Box<dyn Error>> {
        if self.should_fail {
            return Err("Mock OLA client failure".into());
        }

        let message = DmxMessage {
            universe,
            buffer: buffer.clone(),
        };
        self.sent_messages.lock().unwrap().push(message);
        Ok(())
    }
}

/// Factory for creating OLA clients
pub struct OlaClientFactory;

impl OlaClientFactory {
    /// Create a real OLA client (requires OLA to be running)
    pub fn create_real_client(
        config: ola::client::StreamingClientConfig,
    ) -> Result<Box<dyn OlaClient>, Box<dyn Error>> {
        let client = ola::connect_with_config(config)?;
        Ok(Box::new(RealOlaClient::new(client)))
    }

    #[cfg(test)]
    /// Create a mock OLA client for testing
    pub fn create_mock_client() -> Box<dyn OlaClient> {
        Box::new(MockOlaClient::new())
    }
}
