// Pointer gesture recognition: hover, drag-to-zoom, click and double-click

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PendingClick {
    pub x: f64,
    pub y: f64,
    pub deadline: Duration,
    pub token: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    MouseDown {
        start_x: f64,
        moves: u8,
        /// Earlier click still waiting for its timeout when this press began.
        pending: Option<PendingClick>,
    },
    Dragging {
        start_x: f64,
        current_x: f64,
        /// A click from before the press keeps waiting for its timeout.
        pending: Option<PendingClick>,
    },
    PendingClick(PendingClick),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GestureAction {
    Hover { x: f64, y: f64 },
    DragStarted { start_x: f64 },
    DragUpdate { from: f64, to: f64 },
    DragZoom { start_x: f64, end_x: f64 },
    ClickPending { deadline_ms: u64, token: u64 },
    Click { x: f64, y: f64 },
    DoubleClick,
}

/// Moves needed while pressed before a press turns into a drag.
const DRAG_MOVES: u8 = 2;

#[derive(Debug)]
pub struct Gesture {
    state: GestureState,
    click_timeout: Duration,
    next_token: u64,
}

impl Gesture {
    pub fn new(click_timeout: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            click_timeout,
            next_token: 0,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    /// A press. A click whose timeout already ran out is delivered first.
    pub fn pointer_down(&mut self, x: f64, at: Duration) -> Option<GestureAction> {
        let (pending, expired) = match self.state {
            GestureState::PendingClick(p) if at <= p.deadline => (Some(p), None),
            GestureState::PendingClick(p) => (None, Some(GestureAction::Click { x: p.x, y: p.y })),
            _ => (None, None),
        };
        self.state = GestureState::MouseDown {
            start_x: x,
            moves: 0,
            pending,
        };
        expired
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> Option<GestureAction> {
        match self.state {
            GestureState::Idle | GestureState::PendingClick(_) => Some(GestureAction::Hover { x, y }),
            GestureState::MouseDown {
                start_x,
                moves,
                pending,
            } => {
                let moves = moves + 1;
                if moves >= DRAG_MOVES {
                    self.state = GestureState::Dragging {
                        start_x,
                        current_x: x,
                        pending,
                    };
                    Some(GestureAction::DragStarted { start_x })
                } else {
                    self.state = GestureState::MouseDown {
                        start_x,
                        moves,
                        pending,
                    };
                    None
                }
            }
            GestureState::Dragging { start_x, pending, .. } => {
                self.state = GestureState::Dragging {
                    start_x,
                    current_x: x,
                    pending,
                };
                Some(GestureAction::DragUpdate { from: start_x, to: x })
            }
        }
    }

    /// A release: ends a drag, completes a double click, or schedules a
    /// single click that fires once the click timeout passes.
    pub fn pointer_up(&mut self, x: f64, y: f64, at: Duration) -> Option<GestureAction> {
        match self.state {
            GestureState::Dragging { start_x, pending, .. } => {
                self.state = Self::settle(pending);
                if x == start_x {
                    None
                } else {
                    Some(GestureAction::DragZoom { start_x, end_x: x })
                }
            }
            GestureState::MouseDown {
                pending: Some(_), ..
            } => {
                self.state = GestureState::Idle;
                Some(GestureAction::DoubleClick)
            }
            GestureState::MouseDown { pending: None, .. } => {
                self.next_token += 1;
                let pending = PendingClick {
                    x,
                    y,
                    deadline: at + self.click_timeout,
                    token: self.next_token,
                };
                self.state = GestureState::PendingClick(pending);
                Some(GestureAction::ClickPending {
                    deadline_ms: pending.deadline.as_millis() as u64,
                    token: pending.token,
                })
            }
            GestureState::Idle | GestureState::PendingClick(_) => None,
        }
    }

    fn settle(pending: Option<PendingClick>) -> GestureState {
        pending.map_or(GestureState::Idle, GestureState::PendingClick)
    }

    /// Takes the click waiting under the current state if `due` accepts it.
    fn take_pending(&mut self, due: impl Fn(&PendingClick) -> bool) -> Option<GestureAction> {
        match self.state {
            GestureState::PendingClick(p) if due(&p) => {
                self.state = GestureState::Idle;
                Some(GestureAction::Click { x: p.x, y: p.y })
            }
            GestureState::Dragging {
                start_x,
                current_x,
                pending: Some(p),
            } if due(&p) => {
                self.state = GestureState::Dragging {
                    start_x,
                    current_x,
                    pending: None,
                };
                Some(GestureAction::Click { x: p.x, y: p.y })
            }
            _ => None,
        }
    }

    /// Fires a pending click whose deadline has passed, including one that
    /// was waiting when a drag began.
    pub fn tick(&mut self, at: Duration) -> Option<GestureAction> {
        self.take_pending(|p| at >= p.deadline)
    }

    /// Fires the pending click scheduled under `token`, if it is still the
    /// one waiting. A second press or a newer click cancels it.
    pub fn fire(&mut self, token: u64) -> Option<GestureAction> {
        self.take_pending(|p| p.token == token)
    }

    /// The pointer left the chart: any press or drag in progress is dropped,
    /// but a click already waiting for its timeout stays scheduled.
    pub fn leave(&mut self) {
        match self.state {
            GestureState::Dragging { pending, .. } => self.state = Self::settle(pending),
            GestureState::MouseDown { .. } => self.state = GestureState::Idle,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn gesture() -> Gesture {
        Gesture::new(ms(200))
    }

    #[test]
    fn test_hover_when_idle() {
        let mut g = gesture();
        assert_eq!(g.pointer_move(5.0, 6.0), Some(GestureAction::Hover { x: 5.0, y: 6.0 }));
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_drag_to_zoom() {
        let mut g = gesture();
        assert_eq!(g.pointer_down(100.0, ms(0)), None);
        assert_eq!(g.pointer_move(101.0, 0.0), None);
        assert_eq!(
            g.pointer_move(120.0, 0.0),
            Some(GestureAction::DragStarted { start_x: 100.0 })
        );
        assert_eq!(
            g.pointer_move(180.0, 0.0),
            Some(GestureAction::DragUpdate { from: 100.0, to: 180.0 })
        );
        assert_eq!(
            g.pointer_up(180.0, 0.0, ms(50)),
            Some(GestureAction::DragZoom { start_x: 100.0, end_x: 180.0 })
        );
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_zero_width_drag_is_ignored() {
        let mut g = gesture();
        g.pointer_down(100.0, ms(0));
        g.pointer_move(110.0, 0.0);
        g.pointer_move(100.0, 0.0);
        assert_eq!(g.pointer_up(100.0, 0.0, ms(10)), None);
    }

    #[test]
    fn test_single_click_fires_after_timeout() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(1000));
        let pending = g.pointer_up(10.0, 20.0, ms(1010));
        assert_eq!(
            pending,
            Some(GestureAction::ClickPending {
                deadline_ms: 1210,
                token: 1
            })
        );
        assert_eq!(g.tick(ms(1100)), None);
        assert_eq!(g.tick(ms(1210)), Some(GestureAction::Click { x: 10.0, y: 20.0 }));
        assert_eq!(g.tick(ms(1300)), None);
    }

    #[test]
    fn test_double_click_cancels_single() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_up(10.0, 20.0, ms(10));
        assert_eq!(g.pointer_down(10.0, ms(100)), None);
        assert_eq!(g.pointer_up(10.0, 20.0, ms(110)), Some(GestureAction::DoubleClick));
        assert_eq!(g.fire(1), None);
        assert_eq!(g.tick(ms(1000)), None);
    }

    #[test]
    fn test_late_second_press_delivers_first_click() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_up(10.0, 20.0, ms(10));
        assert_eq!(
            g.pointer_down(30.0, ms(500)),
            Some(GestureAction::Click { x: 10.0, y: 20.0 })
        );
        assert!(matches!(
            g.pointer_up(30.0, 40.0, ms(510)),
            Some(GestureAction::ClickPending { token: 2, .. })
        ));
    }

    #[test]
    fn test_fire_only_matching_token() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_up(10.0, 20.0, ms(10));
        assert_eq!(g.fire(7), None);
        assert_eq!(g.fire(1), Some(GestureAction::Click { x: 10.0, y: 20.0 }));
    }

    #[test]
    fn test_leave_drops_drag() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_move(11.0, 0.0);
        g.pointer_move(30.0, 0.0);
        g.leave();
        assert_eq!(g.state(), GestureState::Idle);
        assert_eq!(g.pointer_up(30.0, 0.0, ms(20)), None);
    }

    #[test]
    fn test_drag_keeps_earlier_click_pending() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_up(10.0, 20.0, ms(10));
        // second press inside the window turns into a drag
        g.pointer_down(50.0, ms(100));
        g.pointer_move(60.0, 0.0);
        g.pointer_move(90.0, 0.0);
        assert_eq!(g.tick(ms(150)), None);
        assert_eq!(g.tick(ms(210)), Some(GestureAction::Click { x: 10.0, y: 20.0 }));
        assert_eq!(
            g.pointer_up(90.0, 0.0, ms(300)),
            Some(GestureAction::DragZoom { start_x: 50.0, end_x: 90.0 })
        );
        assert_eq!(g.state(), GestureState::Idle);
    }

    #[test]
    fn test_click_pending_after_short_drag_fires_by_token() {
        let mut g = gesture();
        g.pointer_down(10.0, ms(0));
        g.pointer_up(10.0, 20.0, ms(10));
        g.pointer_down(50.0, ms(50));
        g.pointer_move(60.0, 0.0);
        g.pointer_move(80.0, 0.0);
        assert_eq!(
            g.pointer_up(80.0, 0.0, ms(90)),
            Some(GestureAction::DragZoom { start_x: 50.0, end_x: 80.0 })
        );
        assert!(matches!(g.state(), GestureState::PendingClick(_)));
        assert_eq!(g.fire(1), Some(GestureAction::Click { x: 10.0, y: 20.0 }));
        assert_eq!(g.state(), GestureState::Idle);
    }
}
