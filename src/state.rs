// Represents the current high-level state of the application UI
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum State {
    Initialising, // App is starting, doing the initial scan and connect
    Running,      // Main operational state, showing the device and its settings
    About,        // Showing the about screen
}
