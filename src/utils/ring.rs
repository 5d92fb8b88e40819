use std::collections::VecDeque;

/// Push to the back, then evict from the front until `cap` holds.
pub fn push_capped<T>(buf: &mut VecDeque<T>, item: T, cap: usize) {
    buf.push_back(item);
    while buf.len() > cap {
        buf.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_first() {
        let mut buf = VecDeque::new();
        for i in 0..5 {
            push_capped(&mut buf, i, 3);
        }
        assert_eq!(buf, VecDeque::from(vec![2, 3, 4]));
    }

    #[test]
    fn under_cap_keeps_everything() {
        let mut buf = VecDeque::new();
        push_capped(&mut buf, "a", 3);
        push_capped(&mut buf, "b", 3);
        assert_eq!(buf.len(), 2);
    }
}
