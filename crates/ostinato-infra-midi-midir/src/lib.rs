use midir::{Ignore, MidiInput};
use ostinato_ports::keyboard::{
    KeyboardEvent, KeyboardEventCallback, MidiError, MidiInputPort, MidiInputStream,
};
use ostinato_ports::types::{DeviceId, MidiInputDevice};

/// Translate one raw MIDI message into the keyboard-shaped event the engine
/// consumes. Channel bits are ignored: every channel is the same keyboard.
/// Anything other than a note message or CC64 yields `None`.
fn keyboard_event(message: &[u8]) -> Option<KeyboardEvent> {
    let (&status, data) = message.split_first()?;
    match (status & 0xF0, data) {
        (0x80, &[key, _]) => Some(KeyboardEvent::NoteOff { key }),
        // Note-on at velocity zero is the wire's other spelling of note-off.
        (0x90, &[key, 0]) => Some(KeyboardEvent::NoteOff { key }),
        (0x90, &[key, velocity]) => Some(KeyboardEvent::NoteOn { key, velocity }),
        (0xB0, &[64, value]) => Some(KeyboardEvent::SustainPedal { down: value >= 64 }),
        _ => None,
    }
}

fn device_id(index: usize, name: &str) -> DeviceId {
    DeviceId(format!("midi-in:{index}:{name}"))
}

fn port_name(midi_in: &MidiInput, port: &midir::MidiInputPort) -> String {
    midi_in
        .port_name(port)
        .unwrap_or_else(|_| "Unknown Input".to_string())
}

/// midir-backed keyboard input. Each opened stream parses note and pedal
/// bytes on midir's callback thread and forwards the events; a typical
/// caller hands in a closure that pushes onto the engine's keyboard queue.
pub struct MidirKeyboardInput {
    client_name: String,
}

impl MidirKeyboardInput {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn midi_in(&self) -> Result<MidiInput, MidiError> {
        MidiInput::new(&self.client_name).map_err(|e| MidiError::Backend(e.to_string()))
    }
}

impl Default for MidirKeyboardInput {
    fn default() -> Self {
        Self::new("ostinato")
    }
}

pub struct MidirKeyboardStream {
    connection: Option<midir::MidiInputConnection<KeyboardEventCallback>>,
}

impl MidiInputStream for MidirKeyboardStream {
    fn close(mut self: Box<Self>) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
    }
}

impl MidiInputPort for MidirKeyboardInput {
    fn list_inputs(&self) -> Result<Vec<MidiInputDevice>, MidiError> {
        let midi_in = self.midi_in()?;
        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| {
                let name = port_name(&midi_in, port);
                MidiInputDevice {
                    id: device_id(index, &name),
                    name,
                    is_available: true,
                }
            })
            .collect())
    }

    fn open_input(
        &self,
        wanted: &DeviceId,
        cb: KeyboardEventCallback,
    ) -> Result<Box<dyn MidiInputStream>, MidiError> {
        let mut midi_in = self.midi_in()?;
        midi_in.ignore(Ignore::All);

        let ports = midi_in.ports();
        let port = ports
            .iter()
            .enumerate()
            .find_map(|(index, port)| {
                (&device_id(index, &port_name(&midi_in, port)) == wanted).then(|| port.clone())
            })
            .ok_or_else(|| MidiError::DeviceNotFound(wanted.to_string()))?;

        let connection = midi_in
            .connect(
                &port,
                "ostinato-keyboard",
                move |_timestamp, message, forward| {
                    if let Some(event) = keyboard_event(message) {
                        (forward)(event);
                    }
                },
                cb,
            )
            .map_err(|e| MidiError::Backend(e.to_string()))?;

        Ok(Box::new(MidirKeyboardStream {
            connection: Some(connection),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::keyboard_event;
    use ostinato_ports::keyboard::KeyboardEvent;

    #[test]
    fn note_messages_map_to_key_events() {
        assert_eq!(
            keyboard_event(&[0x90, 60, 100]),
            Some(KeyboardEvent::NoteOn {
                key: 60,
                velocity: 100
            })
        );
        assert_eq!(
            keyboard_event(&[0x80, 60, 40]),
            Some(KeyboardEvent::NoteOff { key: 60 })
        );
    }

    #[test]
    fn velocity_zero_note_on_is_a_note_off() {
        assert_eq!(
            keyboard_event(&[0x90, 72, 0]),
            Some(KeyboardEvent::NoteOff { key: 72 })
        );
    }

    #[test]
    fn channel_bits_are_ignored() {
        assert_eq!(
            keyboard_event(&[0x95, 60, 100]),
            Some(KeyboardEvent::NoteOn {
                key: 60,
                velocity: 100
            })
        );
        assert_eq!(
            keyboard_event(&[0x8F, 60, 0]),
            Some(KeyboardEvent::NoteOff { key: 60 })
        );
    }

    #[test]
    fn cc64_splits_at_the_midpoint() {
        assert_eq!(
            keyboard_event(&[0xB0, 64, 64]),
            Some(KeyboardEvent::SustainPedal { down: true })
        );
        assert_eq!(
            keyboard_event(&[0xB0, 64, 63]),
            Some(KeyboardEvent::SustainPedal { down: false })
        );
        assert_eq!(
            keyboard_event(&[0xB0, 64, 127]),
            Some(KeyboardEvent::SustainPedal { down: true })
        );
    }

    #[test]
    fn unrelated_messages_are_dropped() {
        assert_eq!(keyboard_event(&[0xB0, 1, 30]), None); // mod wheel
        assert_eq!(keyboard_event(&[0xE0, 0, 64]), None); // pitch bend
        assert_eq!(keyboard_event(&[0xC0, 5]), None); // program change
        assert_eq!(keyboard_event(&[0x90]), None); // truncated
        assert_eq!(keyboard_event(&[]), None);
    }
}
