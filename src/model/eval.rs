//! Integral constant folding for non-type template arguments, so that
//! `Arr<2 + 1>` and `Arr<3>` name the same specialization.

use crate::lexer::token::Token;
use crate::parser::ast::Fragment;
use crate::span::Spanned;

/// Evaluates a token-only expression. Returns `None` for anything that names
/// a declaration or uses an operator the folder does not know.
pub fn evaluate(soup: &[Spanned<Fragment>]) -> Option<i128> {
    let mut tokens = Vec::with_capacity(soup.len());
    for fragment in soup {
        match &fragment.node {
            Fragment::Token(tok) => tokens.push(tok),
            Fragment::Name(_) | Fragment::Member(_) => return None,
        }
    }
    let mut folder = Folder { tokens: &tokens, pos: 0 };
    let value = folder.conditional()?;
    if folder.pos == tokens.len() { Some(value) } else { None }
}

struct Folder<'a> {
    tokens: &'a [&'a Token],
    pos: usize,
}

#[derive(Clone, Copy)]
enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinOp {
    fn precedence(self) -> u8 {
        match self {
            BinOp::Mul | BinOp::Div | BinOp::Rem => 10,
            BinOp::Add | BinOp::Sub => 9,
            BinOp::Shl | BinOp::Shr => 8,
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => 7,
            BinOp::Eq | BinOp::Ne => 6,
            BinOp::BitAnd => 5,
            BinOp::BitXor => 4,
            BinOp::BitOr => 3,
            BinOp::And => 2,
            BinOp::Or => 1,
        }
    }

    fn apply(self, l: i128, r: i128) -> Option<i128> {
        Some(match self {
            BinOp::Mul => l.checked_mul(r)?,
            BinOp::Div => l.checked_div(r)?,
            BinOp::Rem => l.checked_rem(r)?,
            BinOp::Add => l.checked_add(r)?,
            BinOp::Sub => l.checked_sub(r)?,
            BinOp::Shl => l.checked_shl(u32::try_from(r).ok()?)?,
            BinOp::Shr => l.checked_shr(u32::try_from(r).ok()?)?,
            BinOp::Lt => (l < r) as i128,
            BinOp::Gt => (l > r) as i128,
            BinOp::Le => (l <= r) as i128,
            BinOp::Ge => (l >= r) as i128,
            BinOp::Eq => (l == r) as i128,
            BinOp::Ne => (l != r) as i128,
            BinOp::BitAnd => l & r,
            BinOp::BitXor => l ^ r,
            BinOp::BitOr => l | r,
            BinOp::And => (l != 0 && r != 0) as i128,
            BinOp::Or => (l != 0 || r != 0) as i128,
        })
    }
}

impl<'a> Folder<'a> {
    fn peek(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset).copied()
    }

    /// Reads the operator at the cursor without consuming it, with its width
    /// in tokens. `>` never combines in the lexer, so `>>` and `>=` arrive split.
    fn peek_binop(&self) -> Option<(BinOp, usize)> {
        let op = match self.peek(0)? {
            Token::Star => (BinOp::Mul, 1),
            Token::Slash => (BinOp::Div, 1),
            Token::Percent => (BinOp::Rem, 1),
            Token::Plus => (BinOp::Add, 1),
            Token::Minus => (BinOp::Sub, 1),
            Token::Shl => (BinOp::Shl, 1),
            Token::Gt => match self.peek(1) {
                Some(Token::Gt) => (BinOp::Shr, 2),
                Some(Token::Eq) => (BinOp::Ge, 2),
                _ => (BinOp::Gt, 1),
            },
            Token::Lt => (BinOp::Lt, 1),
            Token::LtEq => (BinOp::Le, 1),
            Token::EqEq => (BinOp::Eq, 1),
            Token::BangEq => (BinOp::Ne, 1),
            Token::Amp => (BinOp::BitAnd, 1),
            Token::Caret => (BinOp::BitXor, 1),
            Token::Pipe => (BinOp::BitOr, 1),
            Token::AmpAmp => (BinOp::And, 1),
            Token::PipePipe => (BinOp::Or, 1),
            _ => return None,
        };
        Some(op)
    }

    fn conditional(&mut self) -> Option<i128> {
        let cond = self.binary(0)?;
        if matches!(self.peek(0), Some(Token::Question)) {
            self.pos += 1;
            let then = self.conditional()?;
            if !matches!(self.peek(0), Some(Token::Colon)) {
                return None;
            }
            self.pos += 1;
            let otherwise = self.conditional()?;
            return Some(if cond != 0 { then } else { otherwise });
        }
        Some(cond)
    }

    fn binary(&mut self, min_prec: u8) -> Option<i128> {
        let mut lhs = self.unary()?;
        while let Some((op, width)) = self.peek_binop() {
            if op.precedence() <= min_prec {
                break;
            }
            self.pos += width;
            let rhs = self.binary(op.precedence())?;
            lhs = op.apply(lhs, rhs)?;
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<i128> {
        let tok = self.peek(0)?;
        self.pos += 1;
        match tok {
            Token::IntLit(n) => i128::try_from(*n).ok(),
            Token::True => Some(1),
            Token::False => Some(0),
            Token::Minus => self.unary()?.checked_neg(),
            Token::Plus => self.unary(),
            Token::Bang => Some((self.unary()? == 0) as i128),
            Token::Tilde => Some(!self.unary()?),
            Token::LParen => {
                let inner = self.conditional()?;
                if !matches!(self.peek(0), Some(Token::RParen)) {
                    return None;
                }
                self.pos += 1;
                Some(inner)
            }
            _ => None,
        }
    }
}
