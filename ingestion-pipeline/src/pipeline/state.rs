use state_machines::state_machine;

state_machine! {
    name: IngestionMachine,
    state: IngestionState,
    initial: Ready,
    states: [Ready, Extracted, Fingerprinted, Deduplicated, Stored, Published],
    events {
        extract { transition: { from: Ready, to: Extracted } }
        fingerprint { transition: { from: Extracted, to: Fingerprinted } }
        deduplicate { transition: { from: Fingerprinted, to: Deduplicated } }
        store { transition: { from: Fingerprinted, to: Stored } }
        publish { transition: { from: Stored, to: Published } }
    }
}

pub fn ready() -> IngestionMachine<(), Ready> {
    IngestionMachine::new(())
}
