pub mod car;
pub mod conversation;
pub mod invitation;
pub mod member;

pub use car::{Car, CarStatus, NewCar};
pub use conversation::{
    AddCarData, AddCarStep, CarField, ConversationState, FlowState, InviteData, InviteStep,
    ProfileField, RegData, RegStep, SetStatusStep,
};
pub use invitation::{Invitation, InvitationStatus, NewInvitation};
pub use member::{Member, MemberStatus, NewMember};
