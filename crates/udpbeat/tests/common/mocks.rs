// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Mutex;
use udpbeat::event::{Event, PublishError, Publisher, ELK_MESSAGE};

/// Publisher that keeps every event it is given, in order.
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<Event>>,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e[ELK_MESSAGE][ELK_MESSAGE].as_str().unwrap().to_string())
            .collect()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, event: Event) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}
