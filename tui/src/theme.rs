//! Theme and Colors
//!
//! The Protogen palette: cool lab tones for the chrome, warm accents for
//! the things the user cares about (candidates, scores, errors).

use ratatui::style::Color;

// ============================================================================
// Transcript Roles
// ============================================================================

/// User input green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Agent responses - signature teal
pub const AGENT_TEAL: Color = Color::Rgb(110, 200, 210);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

// ============================================================================
// Accents
// ============================================================================

/// Candidate announcements and toast chrome
pub const CANDIDATE_GOLD: Color = Color::Rgb(255, 215, 120);

/// Binding scores
pub const SCORE_GREEN: Color = Color::Rgb(120, 230, 120);

/// Iteration markers
pub const ITERATION_BLUE: Color = Color::Rgb(150, 180, 255);

/// Structure panel highlight
pub const STRUCTURE_CYAN: Color = Color::Rgb(100, 210, 255);

/// Selected timeline entry
pub const SELECTION_MAGENTA: Color = Color::Magenta;

/// Panel borders
pub const BORDER_GRAY: Color = Color::Rgb(70, 70, 80);
