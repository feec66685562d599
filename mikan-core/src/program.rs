use std::collections::HashMap;

use anyhow::{bail, Result};

use crate::command::{Command, Dest};

/// An ordered command sequence plus its label table. Programs are built once
/// at resource-load time, then shared immutably between every sprite that
/// plays them.
#[derive(Debug, Default)]
pub struct AnimationProgram {
    commands: Vec<Command>,
    labels: HashMap<String, usize>,
}

impl AnimationProgram {
    /// Builds the label table and resolves every symbolic jump destination.
    /// This is the one post-construction step a loader must run before the
    /// program is handed to sprites.
    ///
    /// A duplicate label name is a load error. An unknown destination label
    /// is only logged: the command stays unresolved and degrades to a no-op
    /// advance when executed, since animation data is content and must not
    /// take the frame down.
    pub fn link(mut commands: Vec<Command>) -> Result<Self> {
        let mut labels = HashMap::new();
        for (index, command) in commands.iter().enumerate() {
            if let Command::Label(name) = command {
                if labels.insert(name.clone(), index).is_some() {
                    bail!("duplicate label {:?} at sequence {}", name, index);
                }
            }
        }

        for command in &mut commands {
            match command {
                Command::Goto(dest) | Command::Repeat(dest) | Command::Sub(dest) => {
                    resolve(dest, &labels);
                }
                Command::RandomGoto(dests) => {
                    for dest in dests {
                        resolve(dest, &labels);
                    }
                }
                _ => {}
            }
        }

        Ok(Self { commands, labels })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn command(&self, sequence: usize) -> Option<&Command> {
        self.commands.get(sequence)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }
}

fn resolve(dest: &mut Dest, labels: &HashMap<String, usize>) {
    if let Dest::Unresolved(name) = dest {
        match labels.get(name.as_str()) {
            Some(&index) => *dest = Dest::Seq(index),
            None => log::warn!("label {:?} is not defined in this program", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_resolves_labels() {
        let program = AnimationProgram::link(vec![
            Command::Label("start".into()),
            Command::Delay { duration: 2 },
            Command::Goto(Dest::Unresolved("start".into())),
        ])
        .unwrap();

        assert_eq!(program.label("start"), Some(0));
        match program.command(2) {
            Some(Command::Goto(Dest::Seq(0))) => {}
            other => panic!("goto was not resolved: {:?}", other),
        }
    }

    #[test]
    fn test_link_rejects_duplicate_labels() {
        let result = AnimationProgram::link(vec![
            Command::Label("a".into()),
            Command::Label("a".into()),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_label_stays_unresolved() {
        let program = AnimationProgram::link(vec![
            Command::Goto(Dest::Unresolved("missing".into())),
        ])
        .unwrap();
        match program.command(0) {
            Some(Command::Goto(Dest::Unresolved(name))) => assert_eq!(name, "missing"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_label_indices_are_in_range() {
        let program = AnimationProgram::link(vec![
            Command::Delay { duration: 1 },
            Command::Label("mid".into()),
            Command::Delay { duration: 1 },
            Command::Label("end".into()),
        ])
        .unwrap();
        for name in ["mid", "end"] {
            let index = program.label(name).unwrap();
            assert!(index < program.len());
        }
    }
}
