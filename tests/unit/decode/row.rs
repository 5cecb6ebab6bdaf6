use super::*;

#[test]
fn row_allocates_requested_planes_only() {
    let row = Row::new(3, -2, 6, ChannelSet::rgb());
    assert_eq!(row.y(), 3);
    assert_eq!(row.width(), 8);
    assert_eq!(row.channel(Channel::Red).map(<[f32]>::len), Some(8));
    assert!(row.channel(Channel::Alpha).is_none());
}

#[test]
fn set_y_zeroes_pixels() {
    let mut row = Row::new(0, 0, 2, ChannelSet::rgba());
    row.channel_mut(Channel::Green).unwrap()[1] = 0.5;
    row.set_y(9);
    assert_eq!(row.y(), 9);
    assert_eq!(row.channel(Channel::Green).unwrap(), &[0.0, 0.0]);
}

#[test]
fn inverted_bounds_give_empty_row() {
    let row = Row::new(0, 5, 1, ChannelSet::rgb());
    assert_eq!(row.width(), 0);
    assert!(row.channel(Channel::Blue).unwrap().is_empty());
}
