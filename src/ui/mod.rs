/// View helpers for the window shell
///
/// Every function here is a pure mapping from catalog state to widgets;
/// all mutation happens in `Tagshelf::update`.
pub mod editor;
pub mod grid;
pub mod sidebar;
