//! Power-mode lab firmware for the STM32F0 Discovery board.
//!
//! # Overview
//!
//! Two firmware images share this library:
//!
//! - **walkthrough** steps once through Run, Stop, Sleep and Standby, driven
//!   by the user button and an RTC alarm.
//! - **waveform** streams a waveform to the DAC by DMA. At the end of every
//!   full cycle it persists the next waveform index to a backup register,
//!   enters Standby, and is reset by an RTC alarm that resumes playback on
//!   the next waveform.
//!
//! # Module Organization
//!
//! - [`controller`] - Both power-mode state machines
//! - [`wake`] - Wake source arming, waiting and race-free suspend
//! - [`event`] - Interrupt-to-foreground event flags
//! - [`store`] - Waveform index persistence in the backup domain
//! - [`waveform`] - Sample tables and the playback sequencer
//! - [`rtc`] - Time of day, alarm schedules and the RTC driver trait
//! - [`power`] - Reset cause and low-power primitives
//! - [`indicator`] - Status LEDs and the halt loop
//! - `board` - Register-level drivers (`board` feature only)
//!
//! Everything outside `board` is written against driver traits and runs
//! under host unit tests.

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod controller;
pub mod error;
pub mod event;
pub mod indicator;
pub mod power;
pub mod rtc;
pub mod store;
pub mod wake;
pub mod waveform;

#[cfg(feature = "board")]
pub mod board;

#[cfg(test)]
mod mock;
