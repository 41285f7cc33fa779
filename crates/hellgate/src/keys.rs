use std::collections::HashMap;
use std::sync::OnceLock;

use winit::keyboard::KeyCode;

/// Key identifiers understood by the embedded engine (`doom_key_t`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DoomKey {
    Unknown = -1,
    Tab = 9,
    Enter = 13,
    Escape = 27,
    Space = 32,
    Apostrophe = 0x27,
    Multiply = 0x2a,
    Comma = 0x2c,
    Minus = 0x2d,
    Period = 0x2e,
    Slash = 0x2f,
    Num0 = 0x30,
    Num1 = 0x31,
    Num2 = 0x32,
    Num3 = 0x33,
    Num4 = 0x34,
    Num5 = 0x35,
    Num6 = 0x36,
    Num7 = 0x37,
    Num8 = 0x38,
    Num9 = 0x39,
    Semicolon = 0x3b,
    Equals = 0x3d,
    LeftBracket = 0x5b,
    RightBracket = 0x5d,
    A = 0x61,
    B = 0x62,
    C = 0x63,
    D = 0x64,
    E = 0x65,
    F = 0x66,
    G = 0x67,
    H = 0x68,
    I = 0x69,
    J = 0x6a,
    K = 0x6b,
    L = 0x6c,
    M = 0x6d,
    N = 0x6e,
    O = 0x6f,
    P = 0x70,
    Q = 0x71,
    R = 0x72,
    S = 0x73,
    T = 0x74,
    U = 0x75,
    V = 0x76,
    W = 0x77,
    X = 0x78,
    Y = 0x79,
    Z = 0x7a,
    Backspace = 0x7f,
    Ctrl = 0x80 + 0x1d,
    LeftArrow = 0xac,
    UpArrow = 0xad,
    RightArrow = 0xae,
    DownArrow = 0xaf,
    Shift = 0x80 + 0x36,
    Alt = 0x80 + 0x38,
    F1 = 0x80 + 0x3b,
    F2 = 0x80 + 0x3c,
    F3 = 0x80 + 0x3d,
    F4 = 0x80 + 0x3e,
    F5 = 0x80 + 0x3f,
    F6 = 0x80 + 0x40,
    F7 = 0x80 + 0x41,
    F8 = 0x80 + 0x42,
    F9 = 0x80 + 0x43,
    F10 = 0x80 + 0x44,
    F11 = 0x80 + 0x57,
    F12 = 0x80 + 0x58,
    Pause = 0xff,
}

impl DoomKey {
    pub const fn code(self) -> i32 {
        self as i32
    }
}

/// Host key to engine key table. Many-to-one: numpad and top-row digits,
/// both shifts, both controls and both alts collapse onto one engine key.
///
/// Two entries are deliberate: the host escape key never reaches the engine
/// (the host keeps it for its own menu), and `P` drives the engine menu
/// instead.
pub const KEY_TABLE: &[(KeyCode, DoomKey)] = &[
    (KeyCode::Tab, DoomKey::Tab),
    (KeyCode::Enter, DoomKey::Enter),
    (KeyCode::NumpadEnter, DoomKey::Enter),
    (KeyCode::Escape, DoomKey::Unknown),
    (KeyCode::Space, DoomKey::Space),
    (KeyCode::Quote, DoomKey::Apostrophe),
    (KeyCode::NumpadMultiply, DoomKey::Multiply),
    (KeyCode::Comma, DoomKey::Comma),
    (KeyCode::NumpadSubtract, DoomKey::Minus),
    (KeyCode::Period, DoomKey::Period),
    (KeyCode::Slash, DoomKey::Slash),
    (KeyCode::Digit0, DoomKey::Num0),
    (KeyCode::Digit1, DoomKey::Num1),
    (KeyCode::Digit2, DoomKey::Num2),
    (KeyCode::Digit3, DoomKey::Num3),
    (KeyCode::Digit4, DoomKey::Num4),
    (KeyCode::Digit5, DoomKey::Num5),
    (KeyCode::Digit6, DoomKey::Num6),
    (KeyCode::Digit7, DoomKey::Num7),
    (KeyCode::Digit8, DoomKey::Num8),
    (KeyCode::Digit9, DoomKey::Num9),
    (KeyCode::Numpad0, DoomKey::Num0),
    (KeyCode::Numpad1, DoomKey::Num1),
    (KeyCode::Numpad2, DoomKey::Num2),
    (KeyCode::Numpad3, DoomKey::Num3),
    (KeyCode::Numpad4, DoomKey::Num4),
    (KeyCode::Numpad5, DoomKey::Num5),
    (KeyCode::Numpad6, DoomKey::Num6),
    (KeyCode::Numpad7, DoomKey::Num7),
    (KeyCode::Numpad8, DoomKey::Num8),
    (KeyCode::Numpad9, DoomKey::Num9),
    (KeyCode::Semicolon, DoomKey::Semicolon),
    (KeyCode::Equal, DoomKey::Equals),
    (KeyCode::BracketLeft, DoomKey::LeftBracket),
    (KeyCode::BracketRight, DoomKey::RightBracket),
    (KeyCode::KeyA, DoomKey::A),
    (KeyCode::KeyB, DoomKey::B),
    (KeyCode::KeyC, DoomKey::C),
    (KeyCode::KeyD, DoomKey::D),
    (KeyCode::KeyE, DoomKey::E),
    (KeyCode::KeyF, DoomKey::F),
    (KeyCode::KeyG, DoomKey::G),
    (KeyCode::KeyH, DoomKey::H),
    (KeyCode::KeyI, DoomKey::I),
    (KeyCode::KeyJ, DoomKey::J),
    (KeyCode::KeyK, DoomKey::K),
    (KeyCode::KeyL, DoomKey::L),
    (KeyCode::KeyM, DoomKey::M),
    (KeyCode::KeyN, DoomKey::N),
    (KeyCode::KeyO, DoomKey::O),
    (KeyCode::KeyP, DoomKey::Escape),
    (KeyCode::KeyQ, DoomKey::Q),
    (KeyCode::KeyR, DoomKey::R),
    (KeyCode::KeyS, DoomKey::S),
    (KeyCode::KeyT, DoomKey::T),
    (KeyCode::KeyU, DoomKey::U),
    (KeyCode::KeyV, DoomKey::V),
    (KeyCode::KeyW, DoomKey::W),
    (KeyCode::KeyX, DoomKey::X),
    (KeyCode::KeyY, DoomKey::Y),
    (KeyCode::KeyZ, DoomKey::Z),
    (KeyCode::Backspace, DoomKey::Backspace),
    (KeyCode::ControlLeft, DoomKey::Ctrl),
    (KeyCode::ControlRight, DoomKey::Ctrl),
    (KeyCode::ArrowLeft, DoomKey::LeftArrow),
    (KeyCode::ArrowUp, DoomKey::UpArrow),
    (KeyCode::ArrowRight, DoomKey::RightArrow),
    (KeyCode::ArrowDown, DoomKey::DownArrow),
    (KeyCode::ShiftLeft, DoomKey::Shift),
    (KeyCode::ShiftRight, DoomKey::Shift),
    (KeyCode::AltLeft, DoomKey::Alt),
    (KeyCode::AltRight, DoomKey::Alt),
    (KeyCode::F1, DoomKey::F1),
    (KeyCode::F2, DoomKey::F2),
    (KeyCode::F3, DoomKey::F3),
    (KeyCode::F4, DoomKey::F4),
    (KeyCode::F5, DoomKey::F5),
    (KeyCode::F6, DoomKey::F6),
    (KeyCode::F7, DoomKey::F7),
    (KeyCode::F8, DoomKey::F8),
    (KeyCode::F9, DoomKey::F9),
    (KeyCode::F10, DoomKey::F10),
    (KeyCode::F11, DoomKey::F11),
    (KeyCode::F12, DoomKey::F12),
    (KeyCode::Pause, DoomKey::Pause),
];

fn key_map() -> &'static HashMap<KeyCode, DoomKey> {
    static MAP: OnceLock<HashMap<KeyCode, DoomKey>> = OnceLock::new();
    MAP.get_or_init(|| KEY_TABLE.iter().copied().collect())
}

/// Unmapped keys are not an error; they translate to [`DoomKey::Unknown`]
/// and the engine ignores them.
pub fn translate(key: KeyCode) -> DoomKey {
    key_map().get(&key).copied().unwrap_or(DoomKey::Unknown)
}
