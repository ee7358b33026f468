//! Shared mapping between `shakmaty::Role` and the 4-bit role field of a
//! [`crate::codec::MoveToken`] (spec §3 "Move token").
//!
//! Promotions use roles `1..=4` (knight/bishop/rook/queen — a pawn can never
//! promote to itself or the king). Drops (Crazyhouse only) use roles
//! `1..=6` over the full piece set.

use shakmaty::Role;

pub fn promotion_role_to_u8(role: Role) -> Option<u8> {
    match role {
        Role::Knight => Some(1),
        Role::Bishop => Some(2),
        Role::Rook => Some(3),
        Role::Queen => Some(4),
        Role::Pawn | Role::King => None,
    }
}

pub fn u8_to_promotion_role(v: u8) -> Option<Role> {
    match v {
        1 => Some(Role::Knight),
        2 => Some(Role::Bishop),
        3 => Some(Role::Rook),
        4 => Some(Role::Queen),
        _ => None,
    }
}

pub fn drop_role_to_u8(role: Role) -> u8 {
    match role {
        Role::Pawn => 1,
        Role::Knight => 2,
        Role::Bishop => 3,
        Role::Rook => 4,
        Role::Queen => 5,
        Role::King => 6,
    }
}

pub fn u8_to_drop_role(v: u8) -> Option<Role> {
    match v {
        1 => Some(Role::Pawn),
        2 => Some(Role::Knight),
        3 => Some(Role::Bishop),
        4 => Some(Role::Rook),
        5 => Some(Role::Queen),
        6 => Some(Role::King),
        _ => None,
    }
}
