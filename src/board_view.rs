use chessboard::{
    geometry::{square_center, square_origin, BoardRect},
    visual::{MarkKind, VisualBoard, VisualPiece},
    Side, Square,
};
use iced::{Color, Length, Point, Rectangle, Size};
use iced_native::{
    alignment, event,
    layout::{Limits, Node},
    mouse,
    renderer::{Quad, Style},
    text::{self, Text},
    touch,
    widget::{tree, Tree},
    Clipboard, Element, Event, Layout, Shell, Widget,
};

// Color pallet base: RGB(200, 160, 120)
const BLACK_SQUARE: Color = Color::from_rgb(0.29, 0.20, 0.11);
const WHITE_SQUARE: Color = Color::from_rgb(0.71, 0.50, 0.28);
const LAST_MOVE_OVERLAY: Color = Color::from_rgba(0.40, 0.76, 0.50, 0.5);
const CHECK_OVERLAY: Color = Color::from_rgba(0.95, 0.60, 0.0, 0.7);
const CHECKMATE_OVERLAY: Color = Color::from_rgba(0.8, 0.0, 0.0, 0.8);
const WHITE_PIECE: Color = Color::from_rgb(0.97, 0.97, 0.95);
const BLACK_PIECE: Color = Color::from_rgb(0.05, 0.05, 0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    Pressed,
    Moved,
    Released,
    /// the pointer was lost, e.g. a touch got interrupted
    Lost,
}

/// A pointer event over the board, in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardEvent {
    pub action: PointerAction,
    pub x: f32,
    pub y: f32,
    /// where the board was drawn when the event happened
    pub rect: BoardRect,
}

pub fn board_view<'a, Message>(
    visual: &'a VisualBoard,
    dragged: Option<(Square, VisualPiece, (f32, f32))>,
    length: f32,
    on_event: impl Fn(BoardEvent) -> Message + 'a,
) -> BoardView<'a, Message> {
    BoardView {
        visual,
        dragged,
        length,
        on_event: Box::new(on_event),
    }
}

pub struct BoardView<'a, Message> {
    visual: &'a VisualBoard,
    dragged: Option<(Square, VisualPiece, (f32, f32))>,
    length: f32,
    on_event: Box<dyn Fn(BoardEvent) -> Message + 'a>,
}

impl<Message> BoardView<'_, Message> {
    fn publish(
        &self,
        shell: &mut Shell<'_, Message>,
        layout: Layout<'_>,
        action: PointerAction,
        position: Point,
    ) {
        let bounds = layout.bounds();
        shell.publish((self.on_event)(BoardEvent {
            action,
            x: position.x,
            y: position.y,
            rect: BoardRect::new(bounds.x, bounds.y, bounds.width, bounds.height),
        }));
    }

    fn draw_piece<R>(&self, renderer: &mut R, piece: &VisualPiece, center: (f32, f32), size: f32)
    where
        R: text::Renderer,
        R::Font: Default,
    {
        let color = match piece.side {
            Side::White => WHITE_PIECE,
            Side::Black => BLACK_PIECE,
        };
        let letter = piece.kind.letter().to_ascii_uppercase().to_string();
        renderer.fill_text(Text {
            content: &letter,
            bounds: Rectangle {
                x: center.0,
                y: center.1,
                width: size,
                height: size,
            },
            size: size * 0.7,
            color,
            font: Default::default(),
            horizontal_alignment: alignment::Horizontal::Center,
            vertical_alignment: alignment::Vertical::Center,
        });
    }
}

impl<Message, R> Widget<Message, R> for BoardView<'_, Message>
where
    R: text::Renderer,
    R::Font: Default,
{
    fn width(&self) -> Length {
        Length::Fixed(self.length)
    }

    fn height(&self) -> Length {
        Length::Fixed(self.length)
    }

    fn layout(&self, _renderer: &R, _limits: &Limits) -> Node {
        Node::new(Size::new(self.length, self.length))
    }

    fn draw(
        &self,
        _state: &Tree,
        renderer: &mut R,
        _theme: &R::Theme,
        _style: &Style,
        layout: Layout<'_>,
        _cursor_position: Point,
        _viewport: &Rectangle,
    ) {
        let bounds = layout.bounds();
        let rect = BoardRect::new(bounds.x, bounds.y, bounds.width, bounds.height);
        let square_size = Size::new(rect.square_width(), rect.square_height());
        let marked = self.visual.marked_square();
        let drag_origin = self.dragged.map(|(origin, _, _)| origin);

        renderer.with_layer(bounds, |renderer| {
            for square in Square::all() {
                let (x, y) = square_origin(square, &rect);
                let square_bounds = Rectangle::new(Point::new(x, y), square_size);
                let dark = (square.file() + square.rank()) % 2 == 0;
                renderer.fill_quad(
                    Quad {
                        bounds: square_bounds,
                        border_radius: 0.0.into(),
                        border_width: 0.0,
                        border_color: Color::TRANSPARENT,
                    },
                    if dark { BLACK_SQUARE } else { WHITE_SQUARE },
                );

                let overlay = match marked {
                    Some((king, MarkKind::Checkmate)) if king == square => Some(CHECKMATE_OVERLAY),
                    Some((king, MarkKind::Check)) if king == square => Some(CHECK_OVERLAY),
                    _ if self.visual.is_highlighted(square) => Some(LAST_MOVE_OVERLAY),
                    _ => None,
                };
                if let Some(color) = overlay {
                    renderer.fill_quad(
                        Quad {
                            bounds: square_bounds,
                            border_radius: 0.0.into(),
                            border_width: 0.0,
                            border_color: Color::TRANSPARENT,
                        },
                        color,
                    );
                }
            }
        });

        renderer.with_layer(bounds, |renderer| {
            for square in Square::all() {
                if Some(square) == drag_origin {
                    continue;
                }
                if let Some(piece) = self.visual.piece_at(square) {
                    let center = square_center(square, &rect);
                    self.draw_piece(renderer, piece, center, square_size.width);
                }
            }
        });

        if let Some((_, piece, pointer)) = self.dragged {
            renderer.with_layer(bounds, |renderer| {
                self.draw_piece(renderer, &piece, pointer, square_size.width);
            });
        }
    }

    fn on_event(
        &mut self,
        _state: &mut Tree,
        event: Event,
        layout: Layout<'_>,
        cursor_position: Point,
        _renderer: &R,
        _clipboard: &mut dyn Clipboard,
        shell: &mut Shell<'_, Message>,
    ) -> event::Status {
        let dragging = self.dragged.is_some();
        let action = match event {
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left))
                if layout.bounds().contains(cursor_position) =>
            {
                Some((PointerAction::Pressed, cursor_position))
            }
            Event::Touch(touch::Event::FingerPressed { position, .. })
                if layout.bounds().contains(position) =>
            {
                Some((PointerAction::Pressed, position))
            }
            Event::Mouse(mouse::Event::CursorMoved { position })
            | Event::Touch(touch::Event::FingerMoved { position, .. })
                if dragging =>
            {
                Some((PointerAction::Moved, position))
            }
            Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) if dragging => {
                Some((PointerAction::Released, cursor_position))
            }
            Event::Touch(touch::Event::FingerLifted { position, .. }) if dragging => {
                Some((PointerAction::Released, position))
            }
            Event::Touch(touch::Event::FingerLost { position, .. }) if dragging => {
                Some((PointerAction::Lost, position))
            }
            Event::Mouse(mouse::Event::CursorLeft) if dragging => {
                Some((PointerAction::Lost, cursor_position))
            }
            _ => None,
        };

        match action {
            Some((action, position)) => {
                self.publish(shell, layout, action, position);
                event::Status::Captured
            }
            None => event::Status::Ignored,
        }
    }

    fn mouse_interaction(
        &self,
        _state: &Tree,
        layout: Layout<'_>,
        cursor_position: Point,
        _viewport: &Rectangle,
        _renderer: &R,
    ) -> mouse::Interaction {
        if self.dragged.is_some() {
            mouse::Interaction::Grabbing
        } else if layout.bounds().contains(cursor_position) {
            mouse::Interaction::Grab
        } else {
            mouse::Interaction::Idle
        }
    }

    fn tag(&self) -> tree::Tag {
        tree::Tag::stateless()
    }

    fn state(&self) -> tree::State {
        tree::State::None
    }
}

impl<'a, M: 'a, R> From<BoardView<'a, M>> for Element<'a, M, R>
where
    R: text::Renderer + 'a,
    R::Font: Default,
{
    fn from(value: BoardView<'a, M>) -> Self {
        Self::new(value)
    }
}
